//! Chat commands and the parser that produces them from free-form text.

use std::str::FromStr;

use chrono::NaiveDate;

use super::error::QueryError;

/// Date formats accepted for a direct date jump.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d-%m-%Y", "%d.%m.%Y"];

/// A command issued by a chat user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show usage.
    Help,
    /// Move the date cursor back one day.
    Prev,
    /// Move the date cursor to the current date.
    Today,
    /// Move the date cursor to the day after the current date.
    Tomorrow,
    /// Move the date cursor forward one day.
    Next,
    /// Jump the date cursor to a specific date.
    Date(NaiveDate),
    /// Search the cursor date's listings for the given text.
    Search(String),
    /// Show the next page of the last result set.
    More,
    /// Toggle an event in the user's favorites.
    Favorite(String),
    /// List the user's favorites.
    ListFavorites,
    /// Discard the user's session.
    Reset,
}

impl FromStr for Command {
    type Err = QueryError;

    /// Parse a chat message into a command.
    ///
    /// A leading `/` is ignored, keywords are case-insensitive, and a bare date in
    /// one of the supported formats is a date jump.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut text = text.trim();

        // `/events <arg>` carries its argument; any number of `events` prefixes collapse.
        let (keyword, rest) = loop {
            text = text.strip_prefix('/').unwrap_or(text);

            let (keyword, rest) = match text.split_once(char::is_whitespace) {
                Some((keyword, rest)) => (keyword, rest.trim()),
                None => (text, ""),
            };

            if keyword.eq_ignore_ascii_case("events") && !rest.is_empty() {
                text = rest;
                continue;
            }

            break (keyword, rest);
        };

        let command = match keyword.to_lowercase().as_str() {
            "help" => Command::Help,
            "" | "start" | "events" => Command::Today,
            "prev" | "previous" | "back" => Command::Prev,
            "today" | "td" => Command::Today,
            "tomorrow" | "tm" | "tmr" | "tomo" => Command::Tomorrow,
            "next" | "forward" => Command::Next,
            "search" | "find" => Command::Search(rest.to_string()),
            "more" => Command::More,
            "fav" | "favorite" | "favourite" | "save" if rest.is_empty() => {
                return Err(QueryError::InvalidCommand(format!("`{keyword}` needs an event id")));
            }
            "fav" | "favorite" | "favourite" | "save" => Command::Favorite(rest.to_string()),
            "favs" | "favorites" | "favourites" | "list" => Command::ListFavorites,
            "reset" | "logout" | "stop" => Command::Reset,
            _ => return parse_date(text).map(Command::Date).ok_or_else(|| QueryError::InvalidCommand(text.to_string())),
        };

        Ok(command)
    }
}

/// Parse a date in any of the supported formats.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS.iter().find_map(|format| NaiveDate::parse_from_str(text.trim(), format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_navigation_keywords() {
        assert_eq!("prev".parse::<Command>().unwrap(), Command::Prev);
        assert_eq!("Previous".parse::<Command>().unwrap(), Command::Prev);
        assert_eq!("/today".parse::<Command>().unwrap(), Command::Today);
        assert_eq!("td".parse::<Command>().unwrap(), Command::Today);
        assert_eq!("NEXT".parse::<Command>().unwrap(), Command::Next);
        assert_eq!("tmr".parse::<Command>().unwrap(), Command::Tomorrow);
        assert_eq!("start".parse::<Command>().unwrap(), Command::Today);
        assert_eq!("".parse::<Command>().unwrap(), Command::Today);
    }

    #[test]
    fn test_parses_dates_in_all_formats() {
        let expected = Command::Date(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());

        assert_eq!("2025-01-31".parse::<Command>().unwrap(), expected);
        assert_eq!("31-01-2025".parse::<Command>().unwrap(), expected);
        assert_eq!("31.01.2025".parse::<Command>().unwrap(), expected);
        assert_eq!("events 2025-01-31".parse::<Command>().unwrap(), expected);
    }

    #[test]
    fn test_events_keyword_delegates_to_argument() {
        assert_eq!("/events".parse::<Command>().unwrap(), Command::Today);
        assert_eq!("/events tomorrow".parse::<Command>().unwrap(), Command::Tomorrow);
        assert!("/events nonsense".parse::<Command>().is_err());
    }

    #[test]
    fn test_repeated_events_prefixes_do_not_nest() {
        let text = format!("{}today", "events ".repeat(100_000));
        assert_eq!(text.parse::<Command>().unwrap(), Command::Today);

        let text = format!("{}/events 31.01.2025", "/events ".repeat(100_000));
        assert_eq!(text.parse::<Command>().unwrap(), Command::Date(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()));

        assert_eq!("events events".parse::<Command>().unwrap(), Command::Today);
    }

    #[test]
    fn test_parses_search_keeping_original_case() {
        assert_eq!("search Berghain Klubnacht".parse::<Command>().unwrap(), Command::Search("Berghain Klubnacht".to_string()));
        assert_eq!("find  tresor ".parse::<Command>().unwrap(), Command::Search("tresor".to_string()));
        assert_eq!("search".parse::<Command>().unwrap(), Command::Search(String::new()));
    }

    #[test]
    fn test_parses_favorites() {
        assert_eq!("fav 1234567".parse::<Command>().unwrap(), Command::Favorite("1234567".to_string()));
        assert_eq!("favorites".parse::<Command>().unwrap(), Command::ListFavorites);
        assert!(matches!("fav".parse::<Command>(), Err(QueryError::InvalidCommand(_))));
    }

    #[test]
    fn test_rejects_unknown_input() {
        assert!(matches!("dance".parse::<Command>(), Err(QueryError::InvalidCommand(t)) if t == "dance"));
        assert!(matches!("2025-02-30".parse::<Command>(), Err(QueryError::InvalidCommand(_))));
    }
}
