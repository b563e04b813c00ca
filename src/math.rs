use glam::Mat4;

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

// Row-by-column dot product used by the portable matrix multiply
#[inline(always)]
fn dot4(a: [f32; 4], b: [f32; 4]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2] + a[3] * b[3]
}

/// Computes `a * b`, taking the SSE4.1 dot product path when the CPU supports it.
pub fn mul_mat4(a: &Mat4, b: &Mat4) -> Mat4 {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("sse4.1") {
            return unsafe { mul_mat4_sse41(a, b) };
        }
    }
    mul_mat4_scalar(a, b)
}

/// Portable `a * b`. Each output element is one row of `a` dotted with one column of `b`.
pub fn mul_mat4_scalar(a: &Mat4, b: &Mat4) -> Mat4 {
    // Rows of a are the columns of its transpose
    let rows = a.transpose().to_cols_array_2d();
    let cols = b.to_cols_array_2d();
    let mut out = [[0.0f32; 4]; 4];
    for (col, column) in cols.iter().enumerate() {
        for (row, lhs) in rows.iter().enumerate() {
            out[col][row] = dot4(*lhs, *column);
        }
    }
    Mat4::from_cols_array_2d(&out)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse4.1")]
unsafe fn mul_mat4_sse41(a: &Mat4, b: &Mat4) -> Mat4 {
    let rows = a.transpose().to_cols_array_2d();
    let cols = b.to_cols_array_2d();
    let mut out = [[0.0f32; 4]; 4];
    unsafe {
        let r = [
            _mm_loadu_ps(rows[0].as_ptr()),
            _mm_loadu_ps(rows[1].as_ptr()),
            _mm_loadu_ps(rows[2].as_ptr()),
            _mm_loadu_ps(rows[3].as_ptr()),
        ];
        for (col, column) in cols.iter().enumerate() {
            let c = _mm_loadu_ps(column.as_ptr());
            // 0xF1: multiply all four lanes, write the sum to lane 0
            out[col][0] = _mm_cvtss_f32(_mm_dp_ps::<0xF1>(r[0], c));
            out[col][1] = _mm_cvtss_f32(_mm_dp_ps::<0xF1>(r[1], c));
            out[col][2] = _mm_cvtss_f32(_mm_dp_ps::<0xF1>(r[2], c));
            out[col][3] = _mm_cvtss_f32(_mm_dp_ps::<0xF1>(r[3], c));
        }
    }
    Mat4::from_cols_array_2d(&out)
}
