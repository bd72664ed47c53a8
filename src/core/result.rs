//! Success policy for handler results.
//!
//! Every result type is classified into one of four kinds, and success is a pure
//! function of that kind:
//!
//! | kind        | success when             |
//! |-------------|--------------------------|
//! | Boolean     | the value is `true`      |
//! | Numeric     | the value is `>= 0`      |
//! | Categorical | always                   |
//! | Reference   | a value is present       |
//!
//! Caller-defined enums implement [`JobResult`] and return
//! [`ResultKind::Categorical`].

/// Classification of a handler result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResultKind {
    /// Boolean result.
    Boolean(bool),
    /// Integer or floating point result, widened to `f64`.
    Numeric(f64),
    /// Enumerated result; never a failure.
    Categorical,
    /// Object result; `present` is false for the null/empty sentinel.
    Reference {
        /// Whether a value is present.
        present: bool,
    },
}

impl ResultKind {
    /// Whether this result counts as a successful run.
    #[must_use]
    pub fn is_success(self) -> bool {
        match self {
            Self::Boolean(value) => value,
            Self::Numeric(value) => value >= 0.0,
            Self::Categorical => true,
            Self::Reference { present } => present,
        }
    }
}

/// A value a job handler can produce.
pub trait JobResult: Send + 'static {
    /// Classify the value for the success policy.
    fn kind(&self) -> ResultKind;

    /// Shorthand for `self.kind().is_success()`.
    fn is_success(&self) -> bool {
        self.kind().is_success()
    }
}

impl JobResult for bool {
    fn kind(&self) -> ResultKind {
        ResultKind::Boolean(*self)
    }
}

macro_rules! numeric_result {
    ($($ty:ty),* $(,)?) => {
        $(
            impl JobResult for $ty {
                #[allow(clippy::cast_precision_loss, clippy::cast_lossless, clippy::unnecessary_cast)]
                fn kind(&self) -> ResultKind {
                    ResultKind::Numeric(*self as f64)
                }
            }
        )*
    };
}

numeric_result!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl JobResult for () {
    fn kind(&self) -> ResultKind {
        ResultKind::Categorical
    }
}

impl<T: Send + 'static> JobResult for Option<T> {
    fn kind(&self) -> ResultKind {
        ResultKind::Reference {
            present: self.is_some(),
        }
    }
}

impl<T: Send + 'static, E: Send + 'static> JobResult for Result<T, E> {
    fn kind(&self) -> ResultKind {
        ResultKind::Reference {
            present: self.is_ok(),
        }
    }
}
