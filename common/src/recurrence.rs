/// Decides whether a recurrence starting in `month_start` with a cadence
/// of `frequency` months lands on `target_month`, wrapping across year
/// boundaries. Out-of-range months and non-positive frequencies are
/// treated as a filtering condition, never a fault.
pub fn is_due(month_start: i64, frequency: i64, target_month: u32) -> bool {
    if frequency < 1 {
        log::warn!("Ignoring recurrence with non-positive frequency {frequency}");
        return false;
    }
    if !(1..=12).contains(&month_start) {
        log::warn!("Ignoring recurrence with month_start {month_start} outside 1..=12");
        return false;
    }
    if !(1..=12).contains(&target_month) {
        return false;
    }
    let diff = (target_month as i64 - month_start + 12) % 12;
    diff % frequency == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_occurrence_is_the_start_month() {
        for start in 1..=12 {
            for freq in 1..=12 {
                assert!(is_due(start, freq, start as u32));
            }
        }
    }

    #[test]
    fn quarterly_from_march() {
        assert!(is_due(3, 4, 3));
        assert!(is_due(3, 4, 7));
        assert!(is_due(3, 4, 11));
        assert!(!is_due(3, 4, 5));
        assert!(!is_due(3, 4, 6));
    }

    #[test]
    fn yearly_from_january_hits_only_january() {
        assert!(is_due(1, 12, 1));
        for month in 2..=12 {
            assert!(!is_due(1, 12, month));
        }
    }

    #[test]
    fn wraps_across_the_year_boundary() {
        assert!(is_due(11, 3, 2));
        assert!(is_due(11, 3, 5));
        assert!(!is_due(11, 3, 1));
    }

    #[test]
    fn cadences_dividing_the_year_recur_every_frequency_months() {
        for start in 1..=12i64 {
            for freq in [1i64, 2, 3, 4, 6, 12] {
                for k in 0..24i64 {
                    let target = ((start - 1 + k * freq) % 12) + 1;
                    assert!(
                        is_due(start, freq, target as u32),
                        "start={start} freq={freq} k={k} target={target}"
                    );
                }
            }
        }
    }

    #[test]
    fn invalid_inputs_fail_closed() {
        assert!(!is_due(3, 0, 3));
        assert!(!is_due(3, -2, 3));
        assert!(!is_due(0, 4, 4));
        assert!(!is_due(13, 4, 1));
        assert!(!is_due(3, 4, 0));
        assert!(!is_due(3, 4, 13));
    }
}
