//! Baseline containers: final, single-assignment, mutable and atomic.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use super::{Container, ContainerRef, Mutability, Value, Written};
use crate::error::ColdError;

/// Always holds `value`; every write fails.
struct FinalImmutable<V> {
    value: V,
}

impl<V: Value> Container<V> for FinalImmutable<V> {
    fn variant(&self) -> &'static str {
        "final_immutable"
    }

    fn get(&self) -> Result<Option<V>, ColdError> {
        Ok(Some(self.value.clone()))
    }

    fn is_set(&self) -> Result<bool, ColdError> {
        Ok(true)
    }

    fn set(&self, _value: V) -> Result<Written<V>, ColdError> {
        Err(ColdError::immutable(self.variant()))
    }

    fn mutability(&self) -> Result<Mutability, ColdError> {
        Ok(Mutability::Unsupported)
    }
}

/// Starts empty and accepts exactly one write.
struct FutureImmutable<V> {
    slot: RwLock<Option<V>>,
}

impl<V: Value> Container<V> for FutureImmutable<V> {
    fn variant(&self) -> &'static str {
        "future_immutable"
    }

    fn get(&self) -> Result<Option<V>, ColdError> {
        Ok(self.slot.read().clone())
    }

    fn is_set(&self) -> Result<bool, ColdError> {
        Ok(self.slot.read().is_some())
    }

    fn set(&self, value: V) -> Result<Written<V>, ColdError> {
        let mut slot = self.slot.write();
        if slot.is_some() {
            return Err(ColdError::AlreadySet {
                variant: self.variant(),
            });
        }
        *slot = Some(value);
        Ok(Written::InPlace)
    }

    fn mutability(&self) -> Result<Mutability, ColdError> {
        Ok(if self.slot.read().is_some() {
            Mutability::Unsupported
        } else {
            Mutability::Modify
        })
    }
}

/// Plain overwrite cell. Always considered set, even while empty.
struct Mutable<V> {
    value: Mutex<Option<V>>,
}

impl<V: Value> Container<V> for Mutable<V> {
    fn variant(&self) -> &'static str {
        "mutable"
    }

    fn get(&self) -> Result<Option<V>, ColdError> {
        Ok(self.value.lock().clone())
    }

    fn is_set(&self) -> Result<bool, ColdError> {
        Ok(true)
    }

    fn set(&self, value: V) -> Result<Written<V>, ColdError> {
        *self.value.lock() = Some(value);
        Ok(Written::InPlace)
    }

    fn mutability(&self) -> Result<Mutability, ColdError> {
        Ok(Mutability::Modify)
    }
}

/// Overwrite cell for concurrent readers and writers. Last write wins.
///
/// `written` is published after the value, so a reader that observes
/// `is_set() == true` also observes a value.
struct Atomic<V> {
    value: RwLock<Option<V>>,
    written: AtomicBool,
}

impl<V: Value> Container<V> for Atomic<V> {
    fn variant(&self) -> &'static str {
        "atomic"
    }

    fn get(&self) -> Result<Option<V>, ColdError> {
        Ok(self.value.read().clone())
    }

    fn is_set(&self) -> Result<bool, ColdError> {
        Ok(self.written.load(Ordering::Acquire))
    }

    fn set(&self, value: V) -> Result<Written<V>, ColdError> {
        *self.value.write() = Some(value);
        self.written.store(true, Ordering::Release);
        Ok(Written::InPlace)
    }

    fn mutability(&self) -> Result<Mutability, ColdError> {
        Ok(Mutability::Modify)
    }
}

pub fn final_immutable<V: Value>(value: V) -> ContainerRef<V> {
    ContainerRef::new(FinalImmutable { value })
}

pub fn future_immutable<V: Value>() -> ContainerRef<V> {
    ContainerRef::new(FutureImmutable {
        slot: RwLock::new(None),
    })
}

pub fn mutable<V: Value>(value: V) -> ContainerRef<V> {
    ContainerRef::new(Mutable {
        value: Mutex::new(Some(value)),
    })
}

/// A mutable container with no value yet. Still reports `is_set() == true`.
pub fn mutable_empty<V: Value>() -> ContainerRef<V> {
    ContainerRef::new(Mutable {
        value: Mutex::new(None),
    })
}

/// An empty atomic container; `is_set()` flips on the first write.
pub fn atomic<V: Value>() -> ContainerRef<V> {
    ContainerRef::new(Atomic {
        value: RwLock::new(None),
        written: AtomicBool::new(false),
    })
}

pub fn atomic_with<V: Value>(value: V) -> ContainerRef<V> {
    ContainerRef::new(Atomic {
        value: RwLock::new(Some(value)),
        written: AtomicBool::new(true),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::thread;

    #[test]
    fn final_immutable_rejects_writes() {
        let c = final_immutable(5);
        assert_eq!(c.get().unwrap(), Some(5));
        assert!(c.is_set().unwrap());
        assert_eq!(c.mutability().unwrap(), Mutability::Unsupported);

        let err = c.set(6).unwrap_err();
        assert!(matches!(err, ColdError::Unsupported { variant: "final_immutable", .. }));
        assert_eq!(c.get().unwrap(), Some(5));
    }

    #[test]
    fn future_immutable_accepts_exactly_one_write() {
        let c = future_immutable();
        assert!(!c.is_set().unwrap());
        assert_eq!(c.get().unwrap(), None);
        assert_eq!(c.mutability().unwrap(), Mutability::Modify);

        let returned = c.set("x").unwrap();
        assert!(returned.ptr_eq(&c));
        assert_eq!(returned.get().unwrap(), Some("x"));
        assert!(c.is_set().unwrap());
        assert_eq!(c.mutability().unwrap(), Mutability::Unsupported);

        let err = c.set("y").unwrap_err();
        assert!(matches!(err, ColdError::AlreadySet { .. }));
        assert_eq!(c.get().unwrap(), Some("x"));
    }

    #[rstest]
    #[case(0)]
    #[case(-17)]
    #[case(i64::MAX)]
    fn mutable_holds_initial_value(#[case] v: i64) {
        let c = mutable(v);
        assert_eq!(c.get().unwrap(), Some(v));
        assert!(c.is_set().unwrap());
        assert_eq!(c.mutability().unwrap(), Mutability::Modify);
    }

    #[test]
    fn empty_mutable_is_still_set() {
        let c = mutable_empty::<String>();
        assert!(c.is_set().unwrap());
        assert_eq!(c.get().unwrap(), None);

        c.set("now".to_string()).unwrap();
        assert_eq!(c.get().unwrap().as_deref(), Some("now"));
    }

    #[test]
    fn mutable_overwrites_in_place() {
        let c = mutable(1);
        let returned = c.set(2).unwrap().set(3).unwrap();
        assert!(returned.ptr_eq(&c));
        assert_eq!(c.get().unwrap(), Some(3));
    }

    #[test]
    fn atomic_tracks_first_write() {
        let c = atomic::<u32>();
        assert!(!c.is_set().unwrap());
        assert_eq!(c.mutability().unwrap(), Mutability::Modify);

        c.set(1).unwrap();
        assert!(c.is_set().unwrap());
        assert_eq!(c.get().unwrap(), Some(1));

        assert!(atomic_with(9u32).is_set().unwrap());
    }

    #[test]
    fn atomic_survives_concurrent_writers() {
        let c = atomic::<(u32, u32)>();
        let writers: Vec<_> = (0..8u32)
            .map(|i| {
                let c = c.clone();
                thread::spawn(move || {
                    for n in 0..500u32 {
                        c.set((i, n)).unwrap();
                    }
                })
            })
            .collect();

        let reader = {
            let c = c.clone();
            thread::spawn(move || {
                for _ in 0..1000 {
                    if let Some((i, n)) = c.get().unwrap() {
                        assert!(i < 8 && n < 500);
                    }
                }
            })
        };

        for w in writers {
            w.join().unwrap();
        }
        reader.join().unwrap();

        let (i, n) = c.get().unwrap().unwrap();
        assert!(i < 8);
        assert_eq!(n, 499);
    }
}
