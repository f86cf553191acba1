//! Date and time mention detection with resolution against a fixed "now".

use std::sync::LazyLock;

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use regex::{Captures, Regex};

const MONTH: &str = r"(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";

static RE_ISO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").unwrap());

static RE_MONTH_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b{}\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?\b(?:,?\s+(\d{{4}})\b)?",
        MONTH
    ))
    .unwrap()
});

static RE_DAY_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?{}\b\.?(?:,?\s+(\d{{4}})\b)?",
        MONTH
    ))
    .unwrap()
});

static RE_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})(?:/(\d{4}|\d{2}))?\b").unwrap());

static RE_RELATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)\b(?:
            (?P<dat>(?:the\s+)?day\s+after\s+tomorrow)
          | (?P<today>today|tonight)
          | (?P<tomorrow>tomorrow)
          | (?:(?P<modifier>this|next|coming)\s+)?(?P<weekday>monday|tuesday|wednesday|thursday|friday|saturday|sunday)
          | (?P<weekend>this\s+weekend)
          | (?P<next_week>next\s+week)
          | (?P<next_month>next\s+month)
          | (?:(?:the\s+)?end\s+of\s+(?:the\s+)?(?P<end_of>day|week|month))
          | (?P<eo>eod|eow|eom)
          | in\s+(?P<count>\d{1,3})\s+(?P<unit>days?|weeks?)
        )\b",
    )
    .unwrap()
});

static RE_TIME_12H: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:at\s+)?(\d{1,2})(?::(\d{2}))?\s*((?:am|pm)\b|a\.m\.|p\.m\.)").unwrap()
});

static RE_TIME_24H: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:at\s+)?([01]?\d|2[0-3]):([0-5]\d)\b").unwrap());

static RE_NOON: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\b(?:at\s+)?noon\b").unwrap());

/// How a mention was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionKind {
    /// A literal calendar date
    Exact,
    /// A phrase relative to now
    Relative,
    /// A clock time with no date; resolved to today
    TimeOnly,
}

/// A resolved date phrase found in a sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateMention {
    /// Byte range of the phrase in the sentence
    pub start: usize,
    pub end: usize,
    pub phrase: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub kind: MentionKind,
}

impl DateMention {
    pub fn is_fuzzy(&self) -> bool {
        self.kind != MentionKind::Exact
    }
}

struct TimeMention {
    start: usize,
    end: usize,
    time: NaiveTime,
}

/// Find every date phrase in `sentence` resolved against `now`.
///
/// Overlapping matches keep the earliest, then longest, phrase. A clock
/// time is attached to the nearest date; a sentence with only a time
/// yields a single `TimeOnly` mention for today.
pub fn find_dates(sentence: &str, now: NaiveDateTime) -> Vec<DateMention> {
    let today = now.date();
    let mut found: Vec<DateMention> = Vec::new();

    let mut push = |caps: &Captures<'_>, date: Option<NaiveDate>, kind: MentionKind| {
        if let (Some(m), Some(date)) = (caps.get(0), date) {
            found.push(DateMention {
                start: m.start(),
                end: m.end(),
                phrase: m.as_str().trim().to_string(),
                date,
                time: None,
                kind,
            });
        }
    };

    for caps in RE_ISO.captures_iter(sentence) {
        let date = ymd(num(&caps, 1), num(&caps, 2), num(&caps, 3));
        push(&caps, date, MentionKind::Exact);
    }
    for caps in RE_MONTH_DAY.captures_iter(sentence) {
        let date = month_number(&caps[1]).and_then(|month| {
            with_year(today, caps.get(3).map(|y| y.as_str()), month, num(&caps, 2))
        });
        push(&caps, date, MentionKind::Exact);
    }
    for caps in RE_DAY_MONTH.captures_iter(sentence) {
        let date = month_number(&caps[2]).and_then(|month| {
            with_year(today, caps.get(3).map(|y| y.as_str()), month, num(&caps, 1))
        });
        push(&caps, date, MentionKind::Exact);
    }
    for caps in RE_NUMERIC.captures_iter(sentence) {
        let date = with_year(
            today,
            caps.get(3).map(|y| y.as_str()),
            num(&caps, 1),
            num(&caps, 2),
        );
        push(&caps, date, MentionKind::Exact);
    }
    for caps in RE_RELATIVE.captures_iter(sentence) {
        push(&caps, resolve_relative(&caps, today), MentionKind::Relative);
    }

    let mut mentions = remove_overlaps(found);
    let times = find_times(sentence);

    if mentions.is_empty() {
        if let Some(t) = times.first() {
            mentions.push(DateMention {
                start: t.start,
                end: t.end,
                phrase: sentence[t.start..t.end].trim().to_string(),
                date: today,
                time: Some(t.time),
                kind: MentionKind::TimeOnly,
            });
        }
        return mentions;
    }

    for mention in &mut mentions {
        let nearest = times
            .iter()
            .filter(|t| t.end <= mention.start || t.start >= mention.end)
            .min_by_key(|t| {
                if t.start >= mention.end {
                    t.start - mention.end
                } else {
                    mention.start - t.end
                }
            });
        mention.time = nearest.map(|t| t.time);
    }
    mentions
}

fn num(caps: &Captures<'_>, group: usize) -> u32 {
    caps.get(group)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

fn ymd(year: u32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
}

/// Resolve a month/day with an optional written year. Without a year the
/// next occurrence on or after today is used.
fn with_year(today: NaiveDate, year: Option<&str>, month: u32, day: u32) -> Option<NaiveDate> {
    match year {
        Some(y) => {
            let mut year: u32 = y.parse().ok()?;
            if y.len() == 2 {
                year += 2000;
            }
            ymd(year, month, day)
        }
        None => {
            let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)?;
            if this_year >= today {
                Some(this_year)
            } else {
                NaiveDate::from_ymd_opt(today.year() + 1, month, day)
            }
        }
    }
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.to_lowercase().chars().take(3).collect();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn parse_weekday(name: &str) -> Option<Weekday> {
    let weekday = match name.to_lowercase().as_str() {
        "monday" => Weekday::Mon,
        "tuesday" => Weekday::Tue,
        "wednesday" => Weekday::Wed,
        "thursday" => Weekday::Thu,
        "friday" => Weekday::Fri,
        "saturday" => Weekday::Sat,
        "sunday" => Weekday::Sun,
        _ => return None,
    };
    Some(weekday)
}

/// Days from `today` until `target`; `0` when today already is `target`.
fn days_until(today: NaiveDate, target: Weekday) -> u64 {
    let from = today.weekday().num_days_from_monday();
    let to = target.num_days_from_monday();
    u64::from((to + 7 - from) % 7)
}

fn resolve_relative(caps: &Captures<'_>, today: NaiveDate) -> Option<NaiveDate> {
    if caps.name("dat").is_some() {
        return today.checked_add_days(Days::new(2));
    }
    if caps.name("today").is_some() {
        return Some(today);
    }
    if caps.name("tomorrow").is_some() {
        return today.checked_add_days(Days::new(1));
    }
    if let Some(weekday) = caps.name("weekday") {
        let target = parse_weekday(weekday.as_str())?;
        let mut days = days_until(today, target);
        let strictly_after = caps
            .name("modifier")
            .is_some_and(|m| !m.as_str().eq_ignore_ascii_case("this"));
        if strictly_after && days == 0 {
            days = 7;
        }
        return today.checked_add_days(Days::new(days));
    }
    if caps.name("weekend").is_some() {
        if today.weekday() == Weekday::Sun {
            return Some(today);
        }
        return today.checked_add_days(Days::new(days_until(today, Weekday::Sat)));
    }
    if caps.name("next_week").is_some() {
        let to_monday = 7 - u64::from(today.weekday().num_days_from_monday());
        return today.checked_add_days(Days::new(to_monday));
    }
    if caps.name("next_month").is_some() {
        return first_of_month(today)?.checked_add_months(Months::new(1));
    }

    let end_of = caps
        .name("end_of")
        .map(|m| m.as_str().to_lowercase())
        .or_else(|| {
            caps.name("eo").map(|m| match m.as_str().to_lowercase().as_str() {
                "eod" => "day".to_string(),
                "eow" => "week".to_string(),
                _ => "month".to_string(),
            })
        });
    if let Some(end_of) = end_of {
        return match end_of.as_str() {
            "day" => Some(today),
            "week" => today.checked_add_days(Days::new(days_until(today, Weekday::Fri))),
            _ => first_of_month(today)?
                .checked_add_months(Months::new(1))?
                .pred_opt(),
        };
    }

    if let (Some(count), Some(unit)) = (caps.name("count"), caps.name("unit")) {
        let count: u64 = count.as_str().parse().ok()?;
        let days = if unit.as_str().to_lowercase().starts_with("week") {
            count * 7
        } else {
            count
        };
        return today.checked_add_days(Days::new(days));
    }

    None
}

fn first_of_month(date: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
}

fn find_times(sentence: &str) -> Vec<TimeMention> {
    let mut times = Vec::new();

    for caps in RE_TIME_12H.captures_iter(sentence) {
        let hour = num(&caps, 1);
        let minute = num(&caps, 2);
        if !(1..=12).contains(&hour) {
            continue;
        }
        let pm = caps[3].to_lowercase().starts_with('p');
        let hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };
        if let (Some(m), Some(time)) = (caps.get(0), NaiveTime::from_hms_opt(hour, minute, 0)) {
            times.push(TimeMention { start: m.start(), end: m.end(), time });
        }
    }
    for caps in RE_TIME_24H.captures_iter(sentence) {
        let Some(m) = caps.get(0) else {
            continue;
        };
        if times.iter().any(|t| m.start() < t.end && t.start < m.end()) {
            continue;
        }
        if let Some(time) = NaiveTime::from_hms_opt(num(&caps, 1), num(&caps, 2), 0) {
            times.push(TimeMention { start: m.start(), end: m.end(), time });
        }
    }
    for m in RE_NOON.find_iter(sentence) {
        if let Some(time) = NaiveTime::from_hms_opt(12, 0, 0) {
            times.push(TimeMention { start: m.start(), end: m.end(), time });
        }
    }

    times.sort_by_key(|t| t.start);
    times
}

/// Keep the earliest match at each position, preferring the longer one.
fn remove_overlaps(mut found: Vec<DateMention>) -> Vec<DateMention> {
    found.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| b.end.cmp(&a.end)));
    let mut kept: Vec<DateMention> = Vec::with_capacity(found.len());
    for mention in found {
        if kept.last().is_some_and(|last| mention.start < last.end) {
            continue;
        }
        kept.push(mention);
    }
    kept
}
