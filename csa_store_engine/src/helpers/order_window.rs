//! Weekly ordering-window derivation.
//!
//! A window is anchored to two weekday/time marks. Against any `now`, the closing bound is the next
//! occurrence of the end mark and the opening bound is the next occurrence of the start mark, pulled back a
//! week when it would land after the close. The window is open iff `start <= now <= end`, which makes every
//! window span at most seven days.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{db_types::MemberProfile, traits::CartError};

#[derive(Debug, Clone, Error)]
pub enum WindowConfigError {
    #[error("Weekday must be 1..=7 (Monday = 1), got {0}")]
    InvalidDay(u32),
    #[error("Invalid time of day: {0}")]
    InvalidTime(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawWindow", into = "RawWindow")]
pub struct OrderWindow {
    pub start_day: u32,
    pub start_time: NaiveTime,
    pub end_day: u32,
    pub end_time: NaiveTime,
    pub drop_sites: Vec<String>,
    pub home_delivery_zips: Vec<String>,
}

/// The wire form used in configuration: times as "HH:MM", days as ISO weekday numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawWindow {
    start_day: u32,
    start_time: String,
    end_day: u32,
    end_time: String,
    #[serde(default)]
    drop_sites: Vec<String>,
    #[serde(default)]
    home_delivery_zips: Vec<String>,
}

impl TryFrom<RawWindow> for OrderWindow {
    type Error = WindowConfigError;

    fn try_from(raw: RawWindow) -> Result<Self, Self::Error> {
        OrderWindow::new(raw.start_day, &raw.start_time, raw.end_day, &raw.end_time, raw.drop_sites, raw.home_delivery_zips)
    }
}

impl From<OrderWindow> for RawWindow {
    fn from(w: OrderWindow) -> Self {
        RawWindow {
            start_day: w.start_day,
            start_time: w.start_time.format("%H:%M").to_string(),
            end_day: w.end_day,
            end_time: w.end_time.format("%H:%M").to_string(),
            drop_sites: w.drop_sites,
            home_delivery_zips: w.home_delivery_zips,
        }
    }
}

impl OrderWindow {
    pub fn new(
        start_day: u32,
        start_time: &str,
        end_day: u32,
        end_time: &str,
        drop_sites: Vec<String>,
        home_delivery_zips: Vec<String>,
    ) -> Result<Self, WindowConfigError> {
        if !(1..=7).contains(&start_day) {
            return Err(WindowConfigError::InvalidDay(start_day));
        }
        if !(1..=7).contains(&end_day) {
            return Err(WindowConfigError::InvalidDay(end_day));
        }
        let parse = |s: &str| {
            NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| WindowConfigError::InvalidTime(s.to_string()))
        };
        Ok(Self {
            start_day,
            start_time: parse(start_time)?,
            end_day,
            end_time: parse(end_time)?,
            drop_sites,
            home_delivery_zips,
        })
    }

    /// The (start, end) bounds of the cycle containing or following `now`.
    pub fn bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        // the window closes on the last second of the closing minute
        let end_time = self.end_time + Duration::seconds(59);
        let end = next_occurrence(now, self.end_day, end_time);
        let mut start = next_occurrence(now, self.start_day, self.start_time);
        if start >= end {
            start -= Duration::days(7);
        }
        (start, end)
    }

    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        let (start, end) = self.bounds(now);
        start <= now && now <= end
    }

    fn covers(&self, profile: &MemberProfile) -> bool {
        if profile.home_delivery {
            profile.delivery_zip.as_deref().map(|zip| self.home_delivery_zips.iter().any(|z| z == zip)).unwrap_or(false)
        } else {
            profile.drop_site.as_deref().map(|site| self.drop_sites.iter().any(|s| s == site)).unwrap_or(false)
        }
    }
}

/// The next moment that falls on `day` (ISO weekday, Monday = 1) at `time`, counting `now` itself.
fn next_occurrence(now: DateTime<Utc>, day: u32, time: NaiveTime) -> DateTime<Utc> {
    let today = now.weekday().number_from_monday();
    let days_ahead = (day + 7 - today) % 7;
    let candidate = (now.date_naive() + Duration::days(i64::from(days_ahead))).and_time(time).and_utc();
    if candidate < now {
        candidate + Duration::days(7)
    } else {
        candidate
    }
}

/// The window that applies to this member: matched on drop site, or on delivery zip for home delivery.
pub fn window_for_profile<'a>(profile: &MemberProfile, windows: &'a [OrderWindow]) -> Option<&'a OrderWindow> {
    windows.iter().find(|w| w.covers(profile))
}

/// The single gate in front of every cart write.
pub fn user_can_order(profile: &MemberProfile, now: DateTime<Utc>, windows: &[OrderWindow]) -> Result<(), CartError> {
    if !profile.signed_membership_agreement {
        return Err(CartError::MembershipNotSigned);
    }
    let window = window_for_profile(profile, windows).ok_or_else(|| {
        let place = if profile.home_delivery {
            profile.delivery_zip.clone().unwrap_or_else(|| "no zip".to_string())
        } else {
            profile.drop_site.clone().unwrap_or_else(|| "no drop site".to_string())
        };
        CartError::InvalidDropSite(place)
    })?;
    if !window.is_open(now) {
        return Err(CartError::WindowClosed);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;

    fn window() -> OrderWindow {
        // opens Friday 09:00, closes Monday 23:59
        OrderWindow::new(5, "09:00", 1, "23:59", vec!["Farm".to_string()], vec!["97448".to_string()]).unwrap()
    }

    #[test]
    fn bounds_span_at_most_a_week() {
        let w = window();
        for offset in 0..14 {
            let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() + Duration::hours(offset * 13);
            let (start, end) = w.bounds(now);
            assert!(start <= end);
            assert!(end - start <= Duration::days(7));
        }
    }

    #[test]
    fn open_inside_closed_outside() {
        let w = window();
        // 2024-06-01 is a Saturday
        let saturday = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert!(w.is_open(saturday));
        let monday_last_minute = Utc.with_ymd_and_hms(2024, 6, 3, 23, 59, 30).unwrap();
        assert!(w.is_open(monday_last_minute));
        let tuesday = Utc.with_ymd_and_hms(2024, 6, 4, 0, 0, 30).unwrap();
        assert!(!w.is_open(tuesday));
        let friday_early = Utc.with_ymd_and_hms(2024, 6, 7, 8, 0, 0).unwrap();
        assert!(!w.is_open(friday_early));
        let friday_open = Utc.with_ymd_and_hms(2024, 6, 7, 9, 0, 0).unwrap();
        assert!(w.is_open(friday_open));
    }

    #[test]
    fn same_day_window() {
        // opens and closes on Wednesday
        let w = OrderWindow::new(3, "08:00", 3, "20:00", vec![], vec![]).unwrap();
        let wednesday_noon = Utc.with_ymd_and_hms(2024, 6, 5, 12, 0, 0).unwrap();
        assert!(w.is_open(wednesday_noon));
        let wednesday_late = Utc.with_ymd_and_hms(2024, 6, 5, 21, 0, 0).unwrap();
        assert!(!w.is_open(wednesday_late));
    }

    #[test]
    fn gate_reasons() {
        let w = window();
        let mut profile = crate::test_utils::profile_fixture(1);
        profile.drop_site = Some("Farm".to_string());
        let open = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert!(user_can_order(&profile, open, std::slice::from_ref(&w)).is_ok());

        profile.signed_membership_agreement = false;
        assert!(matches!(
            user_can_order(&profile, open, std::slice::from_ref(&w)),
            Err(CartError::MembershipNotSigned)
        ));
        profile.signed_membership_agreement = true;

        profile.drop_site = Some("Elsewhere".to_string());
        assert!(matches!(user_can_order(&profile, open, std::slice::from_ref(&w)), Err(CartError::InvalidDropSite(_))));

        profile.drop_site = None;
        profile.home_delivery = true;
        profile.delivery_zip = Some("97448".to_string());
        let closed = Utc.with_ymd_and_hms(2024, 6, 4, 12, 0, 0).unwrap();
        assert!(matches!(user_can_order(&profile, closed, std::slice::from_ref(&w)), Err(CartError::WindowClosed)));
    }
}
