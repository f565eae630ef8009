//! Special functions used by the heat-response kernels.
//!
//! Rational and Chebyshev fits with relative errors around 1e-7, enough for
//! tabulated kernels that are interpolated afterwards.

/// Euler-Mascheroni constant.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Complementary error function.
pub fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87 + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let ans = t * poly.exp();
    if x >= 0.0 { ans } else { 2.0 - ans }
}

/// Exponential integral `E1(x) = ∫_x^∞ e^-t / t dt` for `x > 0`.
///
/// Returns infinity at 0 and NaN for negative arguments.
pub fn exp1(x: f64) -> f64 {
    if x < 0.0 || x.is_nan() {
        return f64::NAN;
    }
    if x == 0.0 {
        return f64::INFINITY;
    }
    if x <= 1.0 {
        // Power series
        let mut sum = 0.0;
        let mut term = 1.0;
        for k in 1..60 {
            let kf = k as f64;
            term *= -x / kf;
            let contrib = -term / kf;
            sum += contrib;
            if contrib.abs() < 1e-17 * sum.abs() {
                break;
            }
        }
        -EULER_GAMMA - x.ln() + sum
    } else {
        // Continued fraction, modified Lentz
        const TINY: f64 = 1e-300;
        let mut b = x + 1.0;
        let mut c = 1.0 / TINY;
        let mut d = 1.0 / b;
        let mut h = d;
        for i in 1..200 {
            let a = -((i * i) as f64);
            b += 2.0;
            d = 1.0 / (a * d + b);
            c = b + a / c;
            let del = c * d;
            h *= del;
            if (del - 1.0).abs() < 1e-15 {
                break;
            }
        }
        h * (-x).exp()
    }
}

/// Bessel function of the first kind, order one.
pub fn bessel_j1(x: f64) -> f64 {
    let ax = x.abs();
    if ax < 8.0 {
        let y = x * x;
        let num = x
            * (72_362_614_232.0
                + y * (-7_895_059_235.0
                    + y * (242_396_853.1
                        + y * (-2_972_611.439 + y * (15_704.482_60 + y * (-30.160_366_06))))));
        let den = 144_725_228_442.0
            + y * (2_300_535_178.0
                + y * (18_583_304.74 + y * (99_447.433_94 + y * (376.999_139_7 + y))));
        num / den
    } else {
        let (p, q, xx, z) = asymptotic_terms(ax);
        let ans = (0.636_619_772 / ax).sqrt() * (xx.cos() * p - z * xx.sin() * q);
        if x < 0.0 { -ans } else { ans }
    }
}

/// Bessel function of the second kind, order one, for `x > 0`.
pub fn bessel_y1(x: f64) -> f64 {
    if x < 8.0 {
        let y = x * x;
        let num = x
            * (-0.490_060_494_3e13
                + y * (0.127_527_439_0e13
                    + y * (-0.515_343_813_9e11
                        + y * (0.734_926_455_1e9
                            + y * (-0.423_792_272_6e7 + y * 0.851_193_793_5e4)))));
        let den = 0.249_958_057_0e14
            + y * (0.424_441_966_4e12
                + y * (0.373_365_036_7e10
                    + y * (0.224_590_400_2e8
                        + y * (0.102_042_605_0e6 + y * (0.354_963_288_5e3 + y)))));
        num / den + 0.636_619_772 * (bessel_j1(x) * x.ln() - 1.0 / x)
    } else {
        let (p, q, xx, z) = asymptotic_terms(x);
        (0.636_619_772 / x).sqrt() * (xx.sin() * p + z * xx.cos() * q)
    }
}

/// Large-argument amplitude terms shared by J1 and Y1.
fn asymptotic_terms(ax: f64) -> (f64, f64, f64, f64) {
    let z = 8.0 / ax;
    let y = z * z;
    let xx = ax - 2.356_194_491;
    let p = 1.0
        + y * (0.183_105e-2
            + y * (-0.351_639_649_6e-4 + y * (0.245_752_017_4e-5 + y * (-0.240_337_019e-6))));
    let q = 0.046_874_999_95
        + y * (-0.200_269_087_3e-3
            + y * (0.844_919_909_6e-5 + y * (-0.882_289_87e-6 + y * 0.105_787_412e-6)));
    (p, q, xx, z)
}
