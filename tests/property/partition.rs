//! Partition properties: the three sets split the input exactly.

use proptest::prelude::*;
use std::collections::BTreeSet;
use timetabler::types::CourseId;
use timetabler::{ApiError, Course, CoursePartition, Interval, Leave};

fn course_set() -> impl Strategy<Value = Vec<Course>> {
    prop::collection::vec((0u32..2_000, 10u32..200), 0..12).prop_map(|slots| {
        slots
            .into_iter()
            .enumerate()
            .map(|(i, (start, len))| {
                Course::new(i as CourseId + 1, vec![Interval::new(start, start + len)])
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn prop_partition_is_exact(
        courses in course_set(),
        mandatory in prop::collection::btree_set(1u64..12, 0..6),
        leave in (0u32..2_000, 10u32..300),
    ) {
        let leaves = vec![Leave::new(leave.0, leave.0 + leave.1)];
        let partition = CoursePartition::new(&courses, &mandatory, &leaves);

        let mut seen: Vec<CourseId> = partition
            .mandatory()
            .iter()
            .chain(partition.remainder())
            .chain(partition.blocked())
            .map(|c| c.id)
            .collect();
        seen.sort_unstable();
        let input: Vec<CourseId> = courses.iter().map(|c| c.id).collect();
        prop_assert_eq!(seen, input);

        prop_assert!(partition.pruned().all(|c| !c.overlaps_any_leave(&leaves)));
        prop_assert!(partition.blocked().iter().all(|c| c.overlaps_any_leave(&leaves)));
        prop_assert!(partition.mandatory().iter().all(|c| mandatory.contains(&c.id)));
        prop_assert!(partition.remainder().iter().all(|c| !mandatory.contains(&c.id)));

        let blocked_mandatory: BTreeSet<CourseId> =
            partition.blocked_mandatory().map(|c| c.id).collect();
        let conflicts: BTreeSet<CourseId> = partition.conflicts().iter().copied().collect();
        prop_assert_eq!(&blocked_mandatory, &conflicts);
        prop_assert_eq!(
            partition.blocked_remainder().count() + blocked_mandatory.len(),
            partition.blocked().len()
        );

        match partition.clone().into_candidates() {
            Ok(_) => prop_assert!(conflicts.is_empty()),
            Err(ApiError::MandatoryBlocked(ids)) => {
                prop_assert_eq!(ids.into_iter().collect::<BTreeSet<_>>(), conflicts)
            }
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }
}
