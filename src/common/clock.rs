// src/common/clock.rs

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

// Os horários de visita são "hora de parede" do local do evento (sem fuso no banco).
// O Clock converte o instante UTC para esse relógio local.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    offset: FixedOffset,
}

impl Clock {
    pub fn new(utc_offset_minutes: i32) -> anyhow::Result<Self> {
        let offset = utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| anyhow::anyhow!("Offset de fuso inválido: {} minutos", utc_offset_minutes))?;
        Ok(Self { offset })
    }

    pub fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    pub fn now_local(&self) -> NaiveDateTime {
        self.to_local(self.now())
    }

    pub fn today(&self) -> NaiveDate {
        self.now_local().date()
    }

    pub fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&self.offset).naive_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveTime, TimeZone};

    #[test]
    fn utc_instant_converts_to_brasilia_wall_time() {
        let clock = Clock::new(-180).unwrap();
        let instant = Utc.with_ymd_and_hms(2025, 3, 10, 11, 0, 0).unwrap();

        let local = clock.to_local(instant);

        let expected = NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(local, expected);
        assert_eq!(instant.naive_utc() - local, Duration::hours(3));
    }

    #[test]
    fn rejects_offsets_beyond_a_day() {
        assert!(Clock::new(24 * 60).is_err());
    }

    #[test]
    fn huge_offsets_are_an_error_instead_of_overflowing() {
        assert!(Clock::new(i32::MAX).is_err());
        assert!(Clock::new(i32::MIN).is_err());
    }
}
