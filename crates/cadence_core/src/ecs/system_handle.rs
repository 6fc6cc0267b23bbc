use std::fmt;

/// Registration slot of a system within a [`World`](super::World).
///
/// Handles order by registration, which is also the order systems run in
/// the `systems` runner.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SystemHandle(u32);

impl SystemHandle {
    pub(crate) fn new(slot: usize) -> Self {
        Self(slot as u32)
    }

    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) fn slot(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SystemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "system#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_follow_registration_order() {
        let first = SystemHandle::new(0);
        let second = SystemHandle::new(1);
        assert!(first < second);
        assert_eq!(second.slot(), 1);
        assert_eq!(second.to_string(), "system#1");
    }
}
