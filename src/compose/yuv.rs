/// Convert a planar I420 frame to packed RGB (BT.601, limited range).
///
/// Fixed point coefficients scaled by 256.
pub fn i420_to_rgb(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let (w, h) = (width as usize, height as usize);
    let cw = w.div_ceil(2);
    let ch = h.div_ceil(2);

    let (y_plane, chroma) = data.split_at(w * h);
    let (u_plane, v_plane) = chroma.split_at(cw * ch);

    let mut rgb = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let y_row = &y_plane[row * w..(row + 1) * w];
        let c_row = (row / 2) * cw;
        for (col, &luma) in y_row.iter().enumerate() {
            let c = luma as i32 - 16;
            let d = u_plane[c_row + col / 2] as i32 - 128;
            let e = v_plane[c_row + col / 2] as i32 - 128;

            rgb.push(clamp((298 * c + 409 * e + 128) >> 8));
            rgb.push(clamp((298 * c - 100 * d - 208 * e + 128) >> 8));
            rgb.push(clamp((298 * c + 516 * d + 128) >> 8));
        }
    }
    rgb
}

#[inline]
fn clamp(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(width: u32, height: u32, y: u8, u: u8, v: u8) -> Vec<u8> {
        let (w, h) = (width as usize, height as usize);
        let c = w.div_ceil(2) * h.div_ceil(2);
        let mut data = vec![y; w * h];
        data.extend(std::iter::repeat_n(u, c));
        data.extend(std::iter::repeat_n(v, c));
        data
    }

    #[test]
    fn test_black_and_white() {
        let black = i420_to_rgb(&uniform(2, 2, 16, 128, 128), 2, 2);
        assert!(black.iter().all(|&b| b == 0));

        let white = i420_to_rgb(&uniform(2, 2, 235, 128, 128), 2, 2);
        assert!(white.iter().all(|&b| b == 255));
    }

    #[test]
    fn test_red_dominates_for_high_v() {
        let rgb = i420_to_rgb(&uniform(4, 2, 81, 90, 240), 4, 2);
        assert_eq!(rgb.len(), 4 * 2 * 3);
        let (r, g, b) = (rgb[0], rgb[1], rgb[2]);
        assert!(r > 200 && g < 50 && b < 50, "got {r},{g},{b}");
    }
}
