//! Partial-update merge engine
//!
//! A container update only carries the attributes a sensor reported. Every
//! attribute present in the update overwrites the stored value; absent ones
//! leave it untouched. The attribute set is declared once in a static field
//! table instead of being discovered at run time.

use crate::models::ContainerRecord;

/// One entry of a merge table: attribute name and its overwrite-if-present step
pub struct FieldMerge<T> {
    pub name: &'static str,
    apply: fn(&mut T, &T) -> bool,
}

impl<T> FieldMerge<T> {
    /// Returns true when the incoming value replaced the stored one.
    pub fn apply(&self, current: &mut T, incoming: &T) -> bool {
        (self.apply)(current, incoming)
    }
}

/// Records that can absorb partial updates field by field
pub trait Mergeable: Sized + 'static {
    const FIELDS: &'static [FieldMerge<Self>];
}

fn overwrite_if_present<V: Clone>(current: &mut Option<V>, incoming: &Option<V>) -> bool {
    match incoming {
        Some(value) => {
            *current = Some(value.clone());
            true
        }
        None => false,
    }
}

macro_rules! merge_table {
    ($record:ty { $($field:ident => $wire:literal),+ $(,)? }) => {
        impl Mergeable for $record {
            const FIELDS: &'static [FieldMerge<Self>] = &[
                $(FieldMerge {
                    name: $wire,
                    apply: |current: &mut $record, incoming: &$record| {
                        overwrite_if_present(&mut current.$field, &incoming.$field)
                    },
                }),+
            ];
        }
    };
}

merge_table!(ContainerRecord {
    container_no => "containerno",
    bl_no => "blno",
    location => "location",
    carrier => "carrier",
    timestamp => "timestamp",
    temperature => "temperature",
    humidity => "humidity",
    light => "light",
    acceleration => "acceleration",
    door_closed => "doorclosed",
    extra => "extra",
    alerts => "alerts",
    transit_complete => "transitcomplete",
});

/// Merge `incoming` into `current`, returning the merged record.
pub fn merge<T: Mergeable>(mut current: T, incoming: &T) -> T {
    let mut changed = Vec::new();
    for field in T::FIELDS {
        if field.apply(&mut current, incoming) {
            changed.push(field.name);
        }
    }
    tracing::debug!("Merged fields: {:?}", changed);
    current
}
