pub(crate) type Precision = f64;
pub(crate) use std::f64::consts as C;

/// Normalised biquad coefficients, `a0` is always 1.0
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Coefficients {
    pub(crate) b0: Precision,
    pub(crate) b1: Precision,
    pub(crate) b2: Precision,
    pub(crate) a1: Precision,
    pub(crate) a2: Precision,
}

impl Coefficients {
    fn normalised(
        b0: Precision,
        b1: Precision,
        b2: Precision,
        a0: Precision,
        a1: Precision,
        a2: Precision,
    ) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_stable(&self) -> bool {
        // |a1| < 2  &&  |a1| − 1 < a2 < 1
        (self.a1.abs() < 2.0) && ((self.a1.abs() - 1.0) < self.a2 && self.a2 < 1.0)
    }
}

/// The history of one biquad on one channel. Coefficients are kept separately so several channels
/// can share them.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct BiquadState {
    // past input samples, (n - 1) and (n - 2)
    x1: Precision,
    x2: Precision,
    // past output samples, (n - 1) and (n - 2)
    u1: Precision,
    u2: Precision,
}

impl BiquadState {
    #[inline]
    pub(crate) fn process_sample(&mut self, c: &Coefficients, x0: Precision) -> Precision {
        let u0 = x0 * c.b0 + self.x1 * c.b1 + self.x2 * c.b2 - self.u1 * c.a1 - self.u2 * c.a2;

        self.x2 = self.x1;
        self.x1 = x0;
        self.u2 = self.u1;
        self.u1 = u0;

        u0
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

pub(crate) trait FilterKind {
    fn coefficients(f: Precision, q: Precision, sr: Precision) -> Coefficients;
}

/// A second-order section of a given kind. Only holds the coefficients, the caller owns one
/// [`BiquadState`] per channel.
pub(crate) struct SecondOrder<T: FilterKind> {
    coeffs: Coefficients,
    f: Precision,
    q: Precision,
    sr: Precision,
    kind: std::marker::PhantomData<T>,
}

impl<T: FilterKind> SecondOrder<T> {
    pub(crate) fn new(frequency: Precision, q: Precision, sample_rate: Precision) -> Self {
        Self {
            coeffs: T::coefficients(frequency, q, sample_rate),
            f: frequency,
            q,
            sr: sample_rate,
            kind: std::marker::PhantomData,
        }
    }

    #[inline]
    pub(crate) fn process_sample(&self, state: &mut BiquadState, x0: Precision) -> Precision {
        state.process_sample(&self.coeffs, x0)
    }

    #[cfg(test)]
    pub(crate) fn coefficients(&self) -> &Coefficients {
        &self.coeffs
    }

    #[cfg(test)]
    pub(crate) fn frequency(&self) -> Precision {
        self.f
    }

    pub(crate) fn set_frequency(&mut self, f: Precision) {
        if f == self.f {
            return;
        }

        self.f = f;
        self.coeffs = T::coefficients(f, self.q, self.sr);
    }

    pub(crate) fn set_sample_rate(&mut self, sr: Precision) {
        if sr == self.sr {
            return;
        }

        self.sr = sr;
        self.coeffs = T::coefficients(self.f, self.q, sr);
    }
}

// Coefficients below follow the RBJ audio EQ cookbook:
// https://www.w3.org/TR/audio-eq-cookbook/

pub(crate) struct CookbookLP;

impl FilterKind for CookbookLP {
    fn coefficients(f: Precision, q: Precision, sr: Precision) -> Coefficients {
        let w0 = C::TAU * f / sr;
        let cos = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        Coefficients::normalised(
            (1.0 - cos) / 2.0,
            1.0 - cos,
            (1.0 - cos) / 2.0,
            1.0 + alpha,
            -2.0 * cos,
            1.0 - alpha,
        )
    }
}

pub(crate) struct CookbookHP;

impl FilterKind for CookbookHP {
    fn coefficients(f: Precision, q: Precision, sr: Precision) -> Coefficients {
        let w0 = C::TAU * f / sr;
        let cos = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        Coefficients::normalised(
            (1.0 + cos) / 2.0,
            -(1.0 + cos),
            (1.0 + cos) / 2.0,
            1.0 + alpha,
            -2.0 * cos,
            1.0 - alpha,
        )
    }
}

/// Only used as a reference, the crossover builds its allpass from a low-pass and high-pass pair
#[cfg(test)]
pub(crate) struct CookbookAP;

#[cfg(test)]
impl FilterKind for CookbookAP {
    fn coefficients(f: Precision, q: Precision, sr: Precision) -> Coefficients {
        let w0 = C::TAU * f / sr;
        let cos = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        Coefficients::normalised(
            1.0 - alpha,
            -2.0 * cos,
            1.0 + alpha,
            1.0 + alpha,
            -2.0 * cos,
            1.0 - alpha,
        )
    }
}
