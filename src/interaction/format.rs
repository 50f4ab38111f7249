//! Rendering of events, result pages, and favorites into reply text.
//!
//! Output uses Slack's `mrkdwn` flavor: `*bold*`, `` `code` `` and `<url|label>` links.

use chrono::NaiveDate;

use crate::base::types::{Event, FavoriteEntry};

use super::session::ResultPage;

/// Escape the characters Slack treats as control sequences in `mrkdwn`.
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Heading for a day's listings.
pub fn day_heading(date: NaiveDate) -> String {
    format!("🎉 Events for *{}*:", date.format("%a %Y-%m-%d"))
}

/// Heading for search results.
pub fn search_heading(text: &str, date: NaiveDate) -> String {
    format!("🔎 Results for '{}' on *{}*:", escape(text), date.format("%a %Y-%m-%d"))
}

/// Render one event as a block of lines.
pub fn format_event(event: &Event) -> String {
    let time = match (event.start_time, event.end_time) {
        (Some(start), Some(end)) => format!("{}–{}", start.format("%H:%M"), end.format("%H:%M")),
        (Some(start), None) => format!("from {}", start.format("%H:%M")),
        _ => "Time N/A".to_string(),
    };

    let mut lines = vec![format!("*{}*", escape(&event.title)), format!("🕒 {}", time), format!("📍 {}", escape(event.venue_name()))];

    if let Some(url) = &event.url {
        lines.push(format!("🔗 <{}|View Event>", url));
    }

    lines.push(format!("⭐ `fav {}`", escape(&event.id)));

    lines.join("\n")
}

/// Number of pages needed for `len` items.
pub fn page_count(len: usize, per_page: usize) -> usize {
    len.div_ceil(per_page.max(1))
}

/// Render the current page of a result set, with a footer when more pages remain.
///
/// Returns the text and whether a further page exists.
pub fn format_page(results: &ResultPage, per_page: usize) -> (String, bool) {
    let per_page = per_page.max(1);
    let total = results.events.len();
    let start = (results.page * per_page).min(total);
    let end = (start + per_page).min(total);

    let body = results.events[start..end].iter().map(format_event).collect::<Vec<_>>().join("\n\n");
    let has_more = end < total;

    let mut text = format!("{}\n\n{}", results.heading, body);

    if has_more || results.page > 0 {
        text.push_str(&format!("\n\n_Showing {}–{} of {}._", start + 1, end, total));
    }

    if has_more {
        text.push_str(" Send `more` for the next page.");
    }

    (text, has_more)
}

/// Render a user's favorites as a list.
pub fn format_favorites(favorites: &[FavoriteEntry]) -> String {
    let lines = favorites
        .iter()
        .map(|f| {
            let venue = f.venue.as_deref().filter(|v| !v.is_empty()).unwrap_or("Venue N/A");
            let title = match &f.url {
                Some(url) => format!("<{}|{}>", url, escape(&f.title).replace('|', "¦")),
                None => format!("*{}*", escape(&f.title)),
            };

            format!("• {} ({}), {} `fav {}`", title, escape(venue), f.date.format("%a %Y-%m-%d"), escape(&f.event_id))
        })
        .collect::<Vec<_>>();

    format!("⭐ Your favorites:\n\n{}", lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;

    fn event(id: usize) -> Event {
        Event {
            id: id.to_string(),
            title: format!("Night {id}"),
            venue: Some("Tresor".to_string()),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            start_time: None,
            end_time: None,
            url: None,
        }
    }

    fn page(count: usize, page: usize) -> ResultPage {
        ResultPage {
            heading: "Heading".to_string(),
            events: (0..count).map(event).collect(),
            page,
        }
    }

    #[test]
    fn test_format_event_with_all_fields() {
        let event = Event {
            start_time: NaiveDateTime::parse_from_str("2024-05-01 23:00", "%Y-%m-%d %H:%M").ok(),
            end_time: NaiveDateTime::parse_from_str("2024-05-02 06:00", "%Y-%m-%d %H:%M").ok(),
            url: Some("https://ra.co/events/1".to_string()),
            ..event(1)
        };

        let text = format_event(&event);

        assert!(text.starts_with("*Night 1*"));
        assert!(text.contains("🕒 23:00–06:00"));
        assert!(text.contains("📍 Tresor"));
        assert!(text.contains("<https://ra.co/events/1|View Event>"));
        assert!(text.contains("`fav 1`"));
    }

    #[test]
    fn test_format_event_with_missing_fields() {
        let event = Event { venue: None, ..event(2) };

        let text = format_event(&event);

        assert!(text.contains("Time N/A"));
        assert!(text.contains("Venue N/A"));
        assert!(!text.contains("View Event"));
    }

    #[test]
    fn test_pages_split_results() {
        let (first, more) = format_page(&page(23, 0), 10);
        assert!(more);
        assert!(first.contains("Night 0") && first.contains("Night 9") && !first.contains("Night 10"));
        assert!(first.contains("Showing 1–10 of 23"));

        let (last, more) = format_page(&page(23, 2), 10);
        assert!(!more);
        assert!(last.contains("Night 22") && !last.contains("Night 19"));
        assert!(last.contains("Showing 21–23 of 23"));
        assert!(!last.contains("`more`"));
    }

    #[test]
    fn test_single_page_has_no_footer() {
        let (text, more) = format_page(&page(3, 0), 10);

        assert!(!more);
        assert!(!text.contains("Showing"));
    }

    #[test]
    fn test_escapes_control_characters() {
        assert_eq!(escape("Drum & Bass <3 >>"), "Drum &amp; Bass &lt;3 &gt;&gt;");

        let event = Event {
            title: "<!channel> Rave & Co".to_string(),
            venue: Some("Club <Tresor>".to_string()),
            ..event(1)
        };
        let text = format_event(&event);

        assert!(text.contains("*&lt;!channel&gt; Rave &amp; Co*"));
        assert!(text.contains("📍 Club &lt;Tresor&gt;"));
        assert!(!text.contains("<!channel>"));
    }

    #[test]
    fn test_favorite_links_keep_their_label_intact() {
        let favorite = FavoriteEntry {
            user_id: "U1".to_string(),
            event_id: "1".to_string(),
            title: "Techno | House > Disco".to_string(),
            venue: None,
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            url: Some("https://ra.co/events/1".to_string()),
            added_at: chrono::Utc::now(),
        };

        let text = format_favorites(&[favorite]);

        assert!(text.contains("<https://ra.co/events/1|Techno ¦ House &gt; Disco>"));
        assert!(text.contains("(Venue N/A)"));
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(23, 10), 3);
    }
}
