//! Calendar type lookup memoized by base locale.
//!
//! Run with: `RUST_LOG=softcache=trace cargo run --example calendar_type`
//!
//! A locale such as `th_TH@calendar=buddhist` names its calendar directly.
//! Otherwise the calendar depends only on the base locale (`th_TH`), so that
//! lookup goes through a [`SoftCache`] keyed by the base name. The full
//! locale is the construction input.

use std::convert::Infallible;
use std::sync::Arc;

use softcache::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_CALENDAR: &str = "gregorian";
const WORLD_REGION: &str = "001";

// First calendar preferred per region.
const REGION_CALENDARS: &[(&str, &str)] = &[
    ("001", "gregorian"),
    ("AE", "gregorian"),
    ("AF", "persian"),
    ("CN", "gregorian"),
    ("IR", "persian"),
    ("SA", "islamic-umalqura"),
    ("TH", "buddhist"),
];

// Default region for locales that name only a language.
const LIKELY_REGIONS: &[(&str, &str)] = &[("fa", "IR"), ("th", "TH"), ("zh", "CN")];

/// A parsed `language[_REGION][@calendar=type]` locale.
#[derive(Debug, Clone)]
struct Locale {
    language: String,
    region: Option<String>,
    calendar: Option<String>,
}

impl Locale {
    fn parse(tag: &str) -> Self {
        let (base, keywords) = tag.split_once('@').unwrap_or((tag, ""));
        let mut parts = base.split(['_', '-']);
        let language = parts.next().unwrap_or_default().to_ascii_lowercase();
        let region = parts
            .next()
            .filter(|region| !region.is_empty())
            .map(str::to_ascii_uppercase);
        let calendar = keywords
            .split(';')
            .filter_map(|keyword| keyword.split_once('='))
            .find(|(name, _)| name.eq_ignore_ascii_case("calendar"))
            .map(|(_, value)| value.to_ascii_lowercase());
        Self {
            language,
            region,
            calendar,
        }
    }

    fn base_name(&self) -> String {
        match &self.region {
            Some(region) => format!("{}_{region}", self.language),
            None => self.language.clone(),
        }
    }
}

fn lookup(table: &[(&str, &'static str)], key: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, value)| *value)
}

fn lookup_calendar_type(_base: &String, locale: Locale) -> Result<Option<String>, Infallible> {
    let region = locale
        .region
        .as_deref()
        .or_else(|| lookup(LIKELY_REGIONS, &locale.language))
        .unwrap_or(WORLD_REGION);
    let calendar = lookup(REGION_CALENDARS, region)
        .or_else(|| lookup(REGION_CALENDARS, WORLD_REGION))
        .unwrap_or(DEFAULT_CALENDAR);
    tracing::info!(base = %locale.base_name(), region, calendar, "resolved calendar type");
    Ok(Some(calendar.to_owned()))
}

type Constructor = fn(&String, Locale) -> Result<Option<String>, Infallible>;
type CalendarCache = SoftCache<String, String, Locale, Constructor>;

fn calendar_type(cache: &CalendarCache, locale: &Locale) -> Arc<String> {
    if let Some(calendar) = &locale.calendar {
        return Arc::new(calendar.clone());
    }
    match cache.get_instance(&locale.base_name(), locale.clone()) {
        Ok(Some(calendar)) => calendar,
        Ok(None) | Err(_) => Arc::new(DEFAULT_CALENDAR.to_owned()),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cache: CalendarCache = SoftCache::new(lookup_calendar_type as Constructor);

    let tags = [
        "th_TH",
        "th_TH@calendar=gregorian",
        "th",
        "fa_IR",
        "en_US",
        "th_TH",
        "zh",
        "en_US",
    ];
    for tag in tags {
        let locale = Locale::parse(tag);
        println!("{tag:<28} -> {}", calendar_type(&cache, &locale));
    }

    reclaim_soft_references();
    let locale = Locale::parse("th_TH");
    println!("{:<28} -> {}", "th_TH (after reclaim)", calendar_type(&cache, &locale));

    let metrics = cache.metrics();
    println!(
        "slots={} misses={} hits={} recomputes={}",
        metrics.slots, metrics.misses, metrics.hits, metrics.recomputes
    );
}
