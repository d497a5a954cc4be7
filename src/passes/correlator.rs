use chrono::Duration;

use crate::predict::{group_label, Pass, SatelliteRecord};

/// Two single-station passes describe the same physical pass when they start
/// within `tolerance` of each other, or when `a` strictly contains `b`.
pub fn is_same_pass(a: &Pass, b: &Pass, tolerance: Duration) -> bool {
    (a.start - b.start).abs() < tolerance || (a.start < b.start && a.end > b.end)
}

/// Merge passes seen by different stations into joint passes.
///
/// Stations are paired in the record's group order, first before second, and
/// each pair is evaluated once against whatever passes are still unmatched at
/// that point. Matching is pairwise only: a pass seen by three stations ends
/// up as one joint pass for the first matching pair plus a single-station pass
/// for the third.
///
/// Expects a freshly detected record whose groups are all single stations.
pub fn correlate_passes(record: &mut SatelliteRecord, tolerance: Duration) {
    let stations: Vec<String> = record.groups.keys().cloned().collect();

    for (i, first) in stations.iter().enumerate() {
        for second in &stations[i + 1..] {
            let joint = correlate_pair(record, first, second, tolerance);
            if joint.is_empty() {
                continue;
            }

            log::debug!(
                "{}: merged {} passes of {} and {}",
                record.name,
                joint.len(),
                first,
                second
            );
            record
                .groups
                .entry(group_label([first.as_str(), second.as_str()]))
                .or_default()
                .extend(joint);
        }
    }
}

fn correlate_pair(
    record: &mut SatelliteRecord,
    first: &str,
    second: &str,
    tolerance: Duration,
) -> Vec<Pass> {
    let passes1 = record.groups.get_mut(first).map(std::mem::take).unwrap_or_default();
    let passes2 = record.groups.get_mut(second).map(std::mem::take).unwrap_or_default();

    let mut used2 = vec![false; passes2.len()];
    let mut remaining1 = Vec::new();
    let mut joint = Vec::new();

    for pass1 in passes1 {
        let matched = passes2
            .iter()
            .enumerate()
            .find(|(k, pass2)| !used2[*k] && is_same_pass(&pass1, pass2, tolerance))
            .map(|(k, _)| k);

        match matched {
            Some(k) => {
                used2[k] = true;
                joint.push(merge(&pass1, &passes2[k]));
            }
            None => remaining1.push(pass1),
        }
    }

    let remaining2 = passes2
        .into_iter()
        .zip(used2)
        .filter(|(_, used)| !used)
        .map(|(pass, _)| pass)
        .collect();

    if let Some(list) = record.groups.get_mut(first) {
        *list = remaining1;
    }
    if let Some(list) = record.groups.get_mut(second) {
        *list = remaining2;
    }

    joint
}

/// Joint pass spanning both inputs. Elevations keep `a`'s stations first and
/// the provisional id comes from `a`.
fn merge(a: &Pass, b: &Pass) -> Pass {
    let mut joint = Pass {
        id: a.id,
        start: a.start.min(b.start),
        end: a.end.max(b.end),
        elevations: a.elevations.clone(),
    };
    for (station, samples) in b.elevations.iter() {
        for &sample in samples {
            joint.add_elevation(station, sample);
        }
    }
    joint
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, h, m, s).unwrap()
    }

    fn record(groups: Vec<(&str, Vec<Pass>)>) -> SatelliteRecord {
        let mut record = SatelliteRecord::new("SAT1", 1);
        for (station, passes) in groups {
            record.groups.insert(station.to_string(), passes);
        }
        record
    }

    #[test]
    fn overlapping_passes_merge_into_joint_group() {
        let sydney = Pass::single("Sydney", at(10, 0, 0), at(10, 10, 0), 45.3, 1);
        let perth = Pass::single("Perth", at(10, 0, 30), at(10, 9, 0), 38.1, 1);
        let mut record = record(vec![("Sydney", vec![sydney]), ("Perth", vec![perth])]);

        correlate_passes(&mut record, Duration::seconds(180));

        assert!(record.groups.get("Sydney").unwrap().is_empty());
        assert!(record.groups.get("Perth").unwrap().is_empty());

        let joint = record.groups.get("(Sydney, Perth)").unwrap();
        assert_eq!(joint.len(), 1);
        assert_eq!(joint[0].start, at(10, 0, 0));
        assert_eq!(joint[0].end, at(10, 10, 0));
        let elevations: Vec<_> = joint[0]
            .elevations
            .iter()
            .map(|(k, v)| (k.as_str(), v[0]))
            .collect();
        assert_eq!(elevations, [("Sydney", 45.3), ("Perth", 38.1)]);
    }

    #[test]
    fn start_tolerance_match_is_symmetric() {
        let a = Pass::single("A", at(10, 0, 0), at(10, 8, 0), 20.0, 1);
        let b = Pass::single("B", at(10, 1, 0), at(10, 11, 0), 30.0, 1);

        let mut ab = record(vec![("A", vec![a.clone()]), ("B", vec![b.clone()])]);
        let mut ba = record(vec![("B", vec![b]), ("A", vec![a])]);
        correlate_passes(&mut ab, Duration::seconds(180));
        correlate_passes(&mut ba, Duration::seconds(180));

        let joint_ab = &ab.groups.get("(A, B)").unwrap()[0];
        let joint_ba = &ba.groups.get("(B, A)").unwrap()[0];
        assert_eq!(joint_ab.start, joint_ba.start);
        assert_eq!(joint_ab.end, joint_ba.end);
        assert_eq!(joint_ab.max_elevation("A"), joint_ba.max_elevation("A"));
        assert_eq!(joint_ab.max_elevation("B"), joint_ba.max_elevation("B"));
    }

    #[test]
    fn containment_is_directional() {
        let outer = Pass::single("A", at(10, 0, 0), at(10, 20, 0), 50.0, 1);
        let inner = Pass::single("B", at(10, 5, 0), at(10, 15, 0), 10.0, 1);
        let tolerance = Duration::seconds(60);

        assert!(is_same_pass(&outer, &inner, tolerance));
        assert!(!is_same_pass(&inner, &outer, tolerance));
    }

    #[test]
    fn boundary_of_tolerance_does_not_match() {
        let a = Pass::single("A", at(10, 0, 0), at(10, 5, 0), 20.0, 1);
        let b = Pass::single("B", at(10, 3, 0), at(10, 9, 0), 20.0, 1);

        assert!(!is_same_pass(&a, &b, Duration::seconds(180)));
        assert!(is_same_pass(&a, &b, Duration::seconds(181)));
    }

    #[test]
    fn unmatched_passes_stay_with_their_station() {
        let mut record = record(vec![
            (
                "Sydney",
                vec![
                    Pass::single("Sydney", at(1, 0, 0), at(1, 10, 0), 30.0, 1),
                    Pass::single("Sydney", at(5, 0, 0), at(5, 10, 0), 40.0, 2),
                ],
            ),
            (
                "Perth",
                vec![Pass::single("Perth", at(5, 1, 0), at(5, 9, 0), 25.0, 1)],
            ),
        ]);

        correlate_passes(&mut record, Duration::seconds(180));

        let sydney = record.groups.get("Sydney").unwrap();
        assert_eq!(sydney.len(), 1);
        assert_eq!(sydney[0].start, at(1, 0, 0));
        assert!(record.groups.get("Perth").unwrap().is_empty());
        assert_eq!(record.groups.get("(Sydney, Perth)").unwrap()[0].id, 2);
        assert_eq!(record.pass_count(), 2);
    }

    #[test]
    fn each_pass_is_consumed_once() {
        // Two Perth passes both within tolerance of one Sydney pass.
        let mut record = record(vec![
            (
                "Sydney",
                vec![Pass::single("Sydney", at(10, 0, 0), at(10, 10, 0), 30.0, 1)],
            ),
            (
                "Perth",
                vec![
                    Pass::single("Perth", at(10, 0, 30), at(10, 5, 0), 20.0, 1),
                    Pass::single("Perth", at(10, 1, 0), at(10, 6, 0), 21.0, 2),
                ],
            ),
        ]);

        correlate_passes(&mut record, Duration::seconds(180));

        assert_eq!(record.groups.get("(Sydney, Perth)").unwrap().len(), 1);
        assert_eq!(record.groups.get("Perth").unwrap().len(), 1);
        assert_eq!(record.pass_count(), 2);
    }

    #[test]
    fn three_stations_merge_pairwise_only() {
        let mut record = record(vec![
            (
                "A",
                vec![Pass::single("A", at(10, 0, 0), at(10, 10, 0), 30.0, 1)],
            ),
            (
                "B",
                vec![Pass::single("B", at(10, 0, 20), at(10, 9, 0), 20.0, 1)],
            ),
            (
                "C",
                vec![Pass::single("C", at(10, 0, 40), at(10, 8, 0), 10.0, 1)],
            ),
        ]);

        correlate_passes(&mut record, Duration::seconds(180));

        assert_eq!(record.groups.get("(A, B)").unwrap().len(), 1);
        assert_eq!(record.groups.get("C").unwrap().len(), 1);
        assert!(!record.groups.contains_key("(A, C)"));
        assert!(!record.groups.contains_key("(B, C)"));
    }
}
