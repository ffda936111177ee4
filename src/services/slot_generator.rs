// src/services/slot_generator.rs
//
// Geração de horários de visitação: percorre os dias do período, filtra pelos
// dias da semana e fatia a janela diária em intervalos de tamanho fixo.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};

use crate::{common::error::AppError, db::slot_repo::SlotWindow};

#[derive(Debug, Clone)]
pub struct SlotGrid {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub weekdays: Vec<Weekday>,
    pub day_start: NaiveTime,
    pub day_end: NaiveTime,
    pub slot_minutes: i32,
    pub capacity: i32,
}

#[derive(Debug, Default, PartialEq)]
pub struct SlotPlan {
    pub windows: Vec<SlotWindow>,
    pub skipped: usize,
}

impl SlotGrid {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.end_date < self.start_date {
            return Err(AppError::InvalidPeriod("data final antes da inicial".into()));
        }
        if self.day_end <= self.day_start {
            return Err(AppError::InvalidPeriod("hora final deve ser depois da inicial".into()));
        }
        if self.slot_minutes <= 0 {
            return Err(AppError::InvalidPeriod("duração do horário deve ser positiva".into()));
        }
        if self.weekdays.is_empty() {
            return Err(AppError::InvalidPeriod("nenhum dia da semana selecionado".into()));
        }
        if self.capacity <= 0 {
            return Err(AppError::InvalidCapacity("a capacidade deve ser positiva".into()));
        }
        Ok(())
    }

    /// Intervalos de um dia. A sobra no fim da janela é descartada.
    pub fn day_windows(&self, date: NaiveDate) -> Vec<SlotWindow> {
        let step = Duration::minutes(i64::from(self.slot_minutes));
        let mut windows = Vec::new();
        let mut start = self.day_start;

        loop {
            let (end, wrapped) = start.overflowing_add_signed(step);
            if wrapped != 0 || end > self.day_end {
                break;
            }
            windows.push(SlotWindow { date, start_time: start, end_time: end });
            start = end;
        }
        windows
    }

    /// Calcula as novas janelas, pulando as que colidem com `existing`.
    pub fn plan(&self, existing: &[SlotWindow]) -> Result<SlotPlan, AppError> {
        self.validate()?;

        let mut plan = SlotPlan::default();
        for date in self.start_date.iter_days().take_while(|d| *d <= self.end_date) {
            if !self.weekdays.contains(&date.weekday()) {
                continue;
            }
            for window in self.day_windows(date) {
                if existing.iter().any(|other| overlaps(&window, other)) {
                    plan.skipped += 1;
                } else {
                    plan.windows.push(window);
                }
            }
        }
        Ok(plan)
    }
}

// Sobreposição de intervalos semiabertos [início, fim) no mesmo dia
pub fn overlaps(a: &SlotWindow, b: &SlotWindow) -> bool {
    a.date == b.date && a.start_time < b.end_time && b.start_time < a.end_time
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn d(day: u32) -> NaiveDate {
        // maio de 2025: dia 12 é segunda-feira
        NaiveDate::from_ymd_opt(2025, 5, day).unwrap()
    }

    fn grid() -> SlotGrid {
        SlotGrid {
            start_date: d(12),
            end_date: d(18),
            weekdays: vec![Weekday::Mon, Weekday::Wed],
            day_start: t(9, 0),
            day_end: t(12, 0),
            slot_minutes: 60,
            capacity: 30,
        }
    }

    #[test]
    fn only_selected_weekdays_get_slots() {
        let plan = grid().plan(&[]).unwrap();
        assert_eq!(plan.windows.len(), 6);
        assert!(plan.windows.iter().all(|w| w.date == d(12) || w.date == d(14)));
        assert_eq!(plan.skipped, 0);
    }

    #[test]
    fn trailing_remainder_of_the_window_is_dropped() {
        let mut g = grid();
        g.slot_minutes = 50;
        let windows = g.day_windows(d(12));
        // 09:00-09:50, 09:50-10:40, 10:40-11:30; 11:30-12:20 não cabe
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[2].end_time, t(11, 30));
    }

    #[test]
    fn window_ending_at_midnight_does_not_wrap() {
        let mut g = grid();
        g.day_start = t(22, 0);
        g.day_end = NaiveTime::from_hms_opt(23, 59, 59).unwrap();
        let windows = g.day_windows(d(12));
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start_time, t(22, 0));
    }

    #[test]
    fn overlapping_windows_are_skipped_and_counted() {
        let existing = vec![SlotWindow { date: d(12), start_time: t(9, 30), end_time: t(10, 30) }];
        let plan = grid().plan(&existing).unwrap();
        // 09-10 e 10-11 colidem com 09:30-10:30
        assert_eq!(plan.skipped, 2);
        assert_eq!(plan.windows.len(), 4);
        assert!(plan.windows.iter().all(|w| !overlaps(w, &existing[0])));
    }

    #[test]
    fn touching_windows_do_not_overlap() {
        let a = SlotWindow { date: d(12), start_time: t(9, 0), end_time: t(10, 0) };
        let b = SlotWindow { date: d(12), start_time: t(10, 0), end_time: t(11, 0) };
        let c = SlotWindow { date: d(13), start_time: t(9, 0), end_time: t(10, 0) };
        assert!(!overlaps(&a, &b));
        assert!(!overlaps(&a, &c));
        assert!(overlaps(&a, &a));
    }

    #[test]
    fn rerunning_with_the_generated_slots_creates_nothing() {
        let first = grid().plan(&[]).unwrap();
        let second = grid().plan(&first.windows).unwrap();
        assert!(second.windows.is_empty());
        assert_eq!(second.skipped, first.windows.len());
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let mut g = grid();
        g.end_date = d(11);
        assert!(matches!(g.plan(&[]), Err(AppError::InvalidPeriod(_))));

        let mut g = grid();
        g.day_end = t(9, 0);
        assert!(matches!(g.plan(&[]), Err(AppError::InvalidPeriod(_))));

        let mut g = grid();
        g.slot_minutes = 0;
        assert!(matches!(g.plan(&[]), Err(AppError::InvalidPeriod(_))));

        let mut g = grid();
        g.weekdays.clear();
        assert!(matches!(g.plan(&[]), Err(AppError::InvalidPeriod(_))));

        let mut g = grid();
        g.capacity = 0;
        assert!(matches!(g.plan(&[]), Err(AppError::InvalidCapacity(_))));
    }

    #[test]
    fn single_day_range_is_inclusive() {
        let mut g = grid();
        g.end_date = g.start_date;
        let plan = g.plan(&[]).unwrap();
        assert_eq!(plan.windows.len(), 3);
    }
}
