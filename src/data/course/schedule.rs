//! Weekly time slots and the lecturer/room double-booking check.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use super::Course;

/// Minutes since midnight, parsed from a strict 24h `HH:MM` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub fn minutes(self) -> u16 {
        self.0
    }
}

impl FromStr for TimeOfDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 5 || bytes[2] != b':' {
            return Err(format!("'{}' isn't in HH:MM format", s));
        }
        let digits = |range: std::ops::Range<usize>| -> Option<u16> {
            let part = &s[range];
            if part.bytes().all(|b| b.is_ascii_digit()) {
                part.parse().ok()
            } else {
                None
            }
        };

        match (digits(0..2), digits(3..5)) {
            (Some(hour), Some(minute)) if hour < 24 && minute < 60 => {
                Ok(TimeOfDay(hour * 60 + minute))
            }
            (Some(_), Some(_)) => Err(format!("'{}' isn't a valid time of day", s)),
            _ => Err(format!("'{}' isn't in HH:MM format", s)),
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

/// Half-open `[start, end)` interval on one weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub day_of_week: u8,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl Slot {
    pub fn overlaps(&self, other: &Slot) -> bool {
        self.day_of_week == other.day_of_week && self.start < other.end && self.end > other.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    Lecturer,
    Room,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConflict {
    pub kind: ConflictKind,
    pub class_code: String,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl fmt::Display for ScheduleConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ConflictKind::Lecturer => write!(
                f,
                "Lecturer already teaches class {} from {} to {} on that day.",
                self.class_code, self.start, self.end
            ),
            ConflictKind::Room => write!(
                f,
                "Room is already used by class {} from {} to {} on that day.",
                self.class_code, self.start, self.end
            ),
        }
    }
}

/// Scans `existing` for a class of the same lecturer, then for a class in the
/// same room, whose slot overlaps `slot`. Classes that can't be parsed are
/// skipped, `exclude` is the class being edited.
pub fn find_conflict<'a>(
    existing: impl IntoIterator<Item = &'a Course> + Clone,
    exclude: Option<Uuid>,
    lecturer: Uuid,
    room: &str,
    slot: Slot,
) -> Option<ScheduleConflict> {
    let overlapping = |course: &&Course| -> Option<Slot> {
        if Some(course.id) == exclude {
            return None;
        }
        course.slot().ok().filter(|it| it.overlaps(&slot))
    };

    let scan = |kind: ConflictKind| {
        existing.clone().into_iter().find_map(|course| {
            let same = match kind {
                ConflictKind::Lecturer => course.lecturer == lecturer,
                ConflictKind::Room => course.room.eq_ignore_ascii_case(room),
            };
            if !same {
                return None;
            }
            overlapping(&course).map(|it| ScheduleConflict {
                kind,
                class_code: course.class_code.clone(),
                start: it.start,
                end: it.end,
            })
        })
    };

    scan(ConflictKind::Lecturer).or_else(|| scan(ConflictKind::Room))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> TimeOfDay {
        s.parse().expect("valid time")
    }

    fn slot(day: u8, start: &str, end: &str) -> Slot {
        Slot {
            day_of_week: day,
            start: t(start),
            end: t(end),
        }
    }

    #[test]
    fn parses_strict_hh_mm() {
        assert_eq!(t("07:00").minutes(), 420);
        assert_eq!(t("23:59").minutes(), 1439);
        assert_eq!(t("09:05").to_string(), "09:05");
        assert!("7:00".parse::<TimeOfDay>().is_err());
        assert!("24:00".parse::<TimeOfDay>().is_err());
        assert!("12:60".parse::<TimeOfDay>().is_err());
        assert!("ab:cd".parse::<TimeOfDay>().is_err());
        assert!("12-30".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn back_to_back_slots_do_not_overlap() {
        let a = slot(1, "07:00", "09:15");
        assert!(!a.overlaps(&slot(1, "09:15", "11:30")));
        assert!(!slot(1, "05:00", "07:00").overlaps(&a));
        assert!(a.overlaps(&slot(1, "08:00", "10:00")));
        assert!(a.overlaps(&slot(1, "07:30", "08:00")));
        assert!(!a.overlaps(&slot(2, "08:00", "10:00")));
    }
}
