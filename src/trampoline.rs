//! Stack-safe stepping for traversals whose depth follows the input.
//!
//! A computation that would naturally recurse once per repetition, per graph item or
//! per list element is written as a chain of [`Trampoline::Bounce`] steps instead.
//! [`Trampoline::run`] drives the chain in a loop, so the native stack stays flat no
//! matter how many steps the input demands.

/// One step of a trampolined computation.
pub enum Trampoline<'a, T> {
    /// The computation finished with this result.
    Done(T),
    /// More work remains; calling the closure yields the next step.
    Bounce(Box<dyn FnOnce() -> Trampoline<'a, T> + 'a>),
}

impl<'a, T> Trampoline<'a, T> {
    pub fn done(value: T) -> Self {
        Trampoline::Done(value)
    }

    pub fn bounce(step: impl FnOnce() -> Trampoline<'a, T> + 'a) -> Self {
        Trampoline::Bounce(Box::new(step))
    }

    /// Drives the computation to completion.
    pub fn run(self) -> T {
        let mut current = self;
        loop {
            match current {
                Trampoline::Done(value) => return value,
                Trampoline::Bounce(step) => current = step(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_down(n: u64, acc: u64) -> Trampoline<'static, u64> {
        if n == 0 {
            Trampoline::done(acc)
        } else {
            Trampoline::bounce(move || count_down(n - 1, acc + 1))
        }
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        assert_eq!(count_down(1_000_000, 0).run(), 1_000_000);
    }
}
