//! Utilities for working with US postal addresses, city names and states
use tracing::trace;

/// Two-letter abbreviations of all US states plus the District of Columbia
pub const US_STATE_ABBREVS: [&str; 51] = [
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA", "KS",
    "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ", "NM", "NY",
    "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT", "VA", "WA", "WV",
    "WI", "WY", "DC",
];

/// The slug that is used for each state in city urls, e.g. `belmont-massachusetts`
const STATE_SLUGS: [(&str, &str); 51] = [
    ("AL", "alabama"),
    ("AK", "alaska"),
    ("AZ", "arizona"),
    ("AR", "arkansas"),
    ("CA", "california"),
    ("CO", "colorado"),
    ("CT", "connecticut"),
    ("DE", "delaware"),
    ("FL", "florida"),
    ("GA", "georgia"),
    ("HI", "hawaii"),
    ("ID", "idaho"),
    ("IL", "illinois"),
    ("IN", "indiana"),
    ("IA", "iowa"),
    ("KS", "kansas"),
    ("KY", "kentucky"),
    ("LA", "louisiana"),
    ("ME", "maine"),
    ("MD", "maryland"),
    ("MA", "massachusetts"),
    ("MI", "michigan"),
    ("MN", "minnesota"),
    ("MS", "mississippi"),
    ("MO", "missouri"),
    ("MT", "montana"),
    ("NE", "nebraska"),
    ("NV", "nevada"),
    ("NH", "new-hampshire"),
    ("NJ", "new-jersey"),
    ("NM", "new-mexico"),
    ("NY", "new-york"),
    ("NC", "north-carolina"),
    ("ND", "north-dakota"),
    ("OH", "ohio"),
    ("OK", "oklahoma"),
    ("OR", "oregon"),
    ("PA", "pennsylvania"),
    ("RI", "rhode-island"),
    ("SC", "south-carolina"),
    ("SD", "south-dakota"),
    ("TN", "tennessee"),
    ("TX", "texas"),
    ("UT", "utah"),
    ("VT", "vermont"),
    ("VA", "virginia"),
    ("WA", "washington"),
    ("WV", "west-virginia"),
    ("WI", "wisconsin"),
    ("WY", "wyoming"),
    ("DC", "district-of-columbia"),
];

/// Inclusive ranges of the first three digits of a zip code, as assigned by
/// the USPS. Prefixes that belong to territories or military mail are left
/// out.
const ZIP_PREFIXES: &[(u16, u16, &str)] = &[
    (5, 5, "NY"),
    (10, 27, "MA"),
    (28, 29, "RI"),
    (30, 38, "NH"),
    (39, 49, "ME"),
    (50, 54, "VT"),
    (55, 55, "MA"),
    (56, 59, "VT"),
    (60, 69, "CT"),
    (70, 89, "NJ"),
    (100, 149, "NY"),
    (150, 196, "PA"),
    (197, 199, "DE"),
    (200, 200, "DC"),
    (201, 201, "VA"),
    (202, 205, "DC"),
    (206, 219, "MD"),
    (220, 246, "VA"),
    (247, 268, "WV"),
    (270, 289, "NC"),
    (290, 299, "SC"),
    (300, 319, "GA"),
    (320, 339, "FL"),
    (341, 349, "FL"),
    (350, 369, "AL"),
    (370, 385, "TN"),
    (386, 397, "MS"),
    (398, 399, "GA"),
    (400, 427, "KY"),
    (430, 459, "OH"),
    (460, 479, "IN"),
    (480, 499, "MI"),
    (500, 528, "IA"),
    (530, 549, "WI"),
    (550, 567, "MN"),
    (569, 569, "DC"),
    (570, 577, "SD"),
    (580, 588, "ND"),
    (590, 599, "MT"),
    (600, 629, "IL"),
    (630, 658, "MO"),
    (660, 679, "KS"),
    (680, 693, "NE"),
    (700, 715, "LA"),
    (716, 729, "AR"),
    (730, 732, "OK"),
    (733, 733, "TX"),
    (734, 749, "OK"),
    (750, 799, "TX"),
    (800, 816, "CO"),
    (820, 831, "WY"),
    (832, 838, "ID"),
    (840, 847, "UT"),
    (850, 865, "AZ"),
    (870, 884, "NM"),
    (885, 885, "TX"),
    (889, 898, "NV"),
    (900, 961, "CA"),
    (967, 968, "HI"),
    (970, 979, "OR"),
    (980, 994, "WA"),
    (995, 999, "AK"),
];

/// Whether the given string is a state abbreviation (case-insensitive)
pub fn is_state_abbrev(s: &str) -> bool {
    s.len() == 2 && US_STATE_ABBREVS.iter().any(|a| a.eq_ignore_ascii_case(s))
}

/// Looks up the url slug of a state from its abbreviation
pub fn state_slug(abbrev: &str) -> Option<&'static str> {
    STATE_SLUGS
        .iter()
        .find(|(a, _)| a.eq_ignore_ascii_case(abbrev))
        .map(|(_, slug)| *slug)
}

/// Builds the url slug for a city, e.g. `("Belmont", "MA")` becomes
/// `belmont-massachusetts`
pub fn city_slug(city: &str, state_abbrev: &str) -> Option<String> {
    let city = city.trim();
    if city.is_empty() {
        return None;
    }
    let state = state_slug(state_abbrev.trim())?;
    let city = city.to_lowercase().replace(' ', "-").replace('\'', "");
    Some(format!("{city}-{state}"))
}

/// Splits a city slug into a city name and a state name suitable for
/// geocoding. States with multi-word names are recognized, so
/// `concord-new-hampshire` becomes `("concord", "new hampshire")`. If no known
/// state matches, the last part of the slug is taken as the state.
pub fn parse_city_slug(slug: &str) -> Option<(String, String)> {
    let slug = slug.trim().to_lowercase();
    let parts: Vec<&str> = slug.split('-').collect();
    if parts.len() < 2 {
        return None;
    }
    for n in 1..=parts.len().min(5) {
        let candidate = parts[parts.len() - n..].join("-");
        if STATE_SLUGS.iter().any(|(_, s)| *s == candidate) {
            let city = parts[..parts.len() - n].join(" ");
            if city.is_empty() {
                return None;
            }
            return Some((city, candidate.replace('-', " ")));
        }
    }
    let (state, city) = parts.split_last()?;
    Some((city.join(" "), state.to_string()))
}

/// Returns the abbreviation of the state that a zip code belongs to. Accepts
/// both plain and ZIP+4 codes.
pub fn state_from_zip(zip: &str) -> Option<&'static str> {
    let zip = zip.trim();
    let zip = zip.split_once('-').map_or(zip, |(z, _)| z);
    if zip.len() < 5 || !zip.bytes().take(5).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let prefix: u16 = zip[..3].parse().ok()?;
    let state = ZIP_PREFIXES
        .iter()
        .find(|(lo, hi, _)| (*lo..=*hi).contains(&prefix))
        .map(|(_, _, state)| *state);
    trace!(zip, ?state, "Looked up state for zip");
    state
}

/// Brings a zip code into the form stored in the database. A ZIP+4 code is cut
/// down to its first five digits. Returns `None` for anything else that doesn't
/// fit in five characters.
pub fn normalize_zip(zip: &str) -> Option<String> {
    let zip = zip.trim();
    if zip.chars().count() <= 5 {
        return Some(zip.to_string());
    }
    match zip.split_once('-') {
        Some((five, four))
            if is_zip(five) && four.len() == 4 && four.bytes().all(|b| b.is_ascii_digit()) =>
        {
            Some(five.to_string())
        }
        _ => None,
    }
}

fn is_zip(s: &str) -> bool {
    s.len() == 5 && s.bytes().all(|b| b.is_ascii_digit())
}

fn address_parts(address: &str) -> Vec<&str> {
    address
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// The city and state that were found in an address
#[derive(Debug, Clone, PartialEq)]
pub struct CityState {
    pub city: String,
    pub state: Option<String>,
}

/// Extracts the city and, if possible, the state from an address such as
/// `123 Main St, Boston, MA`. When the address has no state, it is looked up
/// from the zip code.
pub fn parse_city_state_from_address(address: &str, zip: Option<&str>) -> Option<CityState> {
    let parts = address_parts(address);
    let zip = zip.map(str::trim).filter(|z| !z.is_empty());
    let from_zip = |fallback: Option<&str>| {
        zip.or(fallback)
            .and_then(state_from_zip)
            .map(ToString::to_string)
    };
    match parts.as_slice() {
        [] => None,
        [city] => Some(CityState {
            city: city.to_string(),
            state: from_zip(None),
        }),
        [.., city, last] if is_state_abbrev(last) => Some(CityState {
            city: city.to_string(),
            state: Some(last.to_uppercase()),
        }),
        [.., city, last] if is_zip(last) => Some(CityState {
            city: city.to_string(),
            state: from_zip(Some(*last)),
        }),
        [.., last] => Some(CityState {
            city: last.to_string(),
            state: from_zip(None),
        }),
    }
}

/// Makes sure that the address ends with a state abbreviation, adding it
/// from the zip code where possible. A zip code at the end of the address is
/// replaced by the state.
pub fn ensure_state_in_address(address: &str, zip: &str) -> String {
    let trimmed = address.trim();
    let parts = address_parts(trimmed);
    let Some(&last) = parts.last() else {
        return address.to_string();
    };
    if is_state_abbrev(last) {
        return address.to_string();
    }
    if is_zip(last) {
        let zip = if zip.trim().is_empty() { last } else { zip };
        return match (state_from_zip(zip), parts.len()) {
            (Some(_), n) if n >= 2 && is_state_abbrev(parts[n - 2]) => address.to_string(),
            (Some(state), n) if n >= 2 => match trimmed.rsplit_once(',') {
                Some((head, _)) => format!("{}, {state}", head.trim()),
                None => address.to_string(),
            },
            _ => address.to_string(),
        };
    }
    match state_from_zip(zip) {
        Some(state) => format!("{trimmed}, {state}"),
        None => address.to_string(),
    }
}

fn title_word(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut boundary = true;
    for c in word.chars() {
        if boundary {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        boundary = !(c.is_alphanumeric() || c == '\'');
    }
    out
}

/// Converts text such as `CITYNAME TOWN HALL` to `Cityname Town Hall`. Words
/// that are state abbreviations are kept in upper case. Runs of whitespace are
/// collapsed.
pub fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            if is_state_abbrev(word) {
                word.to_uppercase()
            } else {
                title_word(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
