//! Mathematical constants

/// ln(π)
pub const LN_PI: f64 = 1.144_729_885_849_400_2;
/// 0.5 ln(2π)
pub const HALF_LN_2PI: f64 = 0.918_938_533_204_672_7;
