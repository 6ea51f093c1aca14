//! The notes demo page.
//!
//! A server-rendered notes sidebar. The search field, the "New" button and
//! every sidebar entry are islands, so the client runtime can make them
//! interactive without re-rendering the rest of the page.

use chrono::{DateTime, Local};

use crate::component::component;
use crate::island::{island, slot, ISLAND_STYLES};
use crate::node::{Child, Markup, Node, PropValue, Props};
use crate::notes::{Note, NoteSource};
use crate::{h, props, Result};

const IMPORT_MAP: &str = r#"
{
    "imports": {
        "react": "https://esm.sh/react@canary?dev",
        "react-dom/client": "https://esm.sh/react-dom@canary/client?dev",
        "react/jsx-runtime": "https://esm.sh/react@canary/jsx-runtime?dev",
        "react-error-boundary": "https://esm.sh/react-error-boundary"
    }
}"#;

const BOOTSTRAP_SRC: &str = "/static/strike/bootstrap.js";

/// Path and search text of the current request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub query: String,
}

impl Location {
    pub fn new(path: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: query.into(),
        }
    }
}

/// The whole document.
pub fn page(location: &Location, notes: &dyn NoteSource) -> Result<Node> {
    let nav = h!(
        "nav",
        h!("a", props! { "href" => "/" }, "Home"),
        " ",
        h!("a", props! { "href" => "/about" }, "About")
    );

    h!(
        "html",
        props! { "lang" => "en" },
        h!(
            "head",
            h!("meta", props! { "charset" => "utf-8" }),
            h!(
                "meta",
                props! {
                    "name" => "description",
                    "content" => "React with Server Components demo",
                }
            ),
            h!(
                "meta",
                props! {
                    "name" => "viewport",
                    "content" => "width=device-width, initial-scale=1",
                }
            ),
            h!("link", props! { "rel" => "stylesheet", "href" => "/static/style.css" }),
            h!("title", "React Notes"),
            h!(
                "style",
                props! { "type" => "text/css" },
                Markup::new(ISLAND_STYLES)
            )
        ),
        h!(
            "body",
            app(location, notes),
            h!(
                "div#root",
                nav,
                format!("Loading... {}", location.path)
            ),
            h!(
                "script",
                props! { "type" => "importmap" },
                Markup::new(IMPORT_MAP)
            ),
            h!("script", props! { "src" => BOOTSTRAP_SRC, "type" => "module" })
        )
    )
}

/// Sidebar and (empty) note viewer.
pub fn app(location: &Location, notes: &dyn NoteSource) -> Result<Node> {
    h!(
        "div.main",
        h!(
            "section.col.sidebar",
            h!(
                "section.sidebar-header",
                h!(
                    "img.logo",
                    props! {
                        "src" => "/static/logo.svg",
                        "width" => "22px",
                        "height" => "20px",
                        "alt" => "",
                        "role" => "presentation",
                    }
                ),
                h!("strong", "React Notes")
            ),
            h!(
                "section.sidebar-menu",
                props! { "role" => "menubar" },
                h!(search_field),
                h!(edit_button, props! { "noteId" => PropValue::Null }, "New")
            ),
            h!(
                "nav",
                h!(component("NoteList", || note_list(&location.query, notes)))
            )
        ),
        h!("section.col.note-viewer")
    )
}

pub fn search_field() -> Result<Node> {
    island(
        "SearchField",
        Props::new(),
        vec![h!(
            "form.search",
            props! { "role" => "search" },
            h!("label.offscreen"),
            h!("input", props! { "placeholder" => "Search", "disabled" => "disabled" })
        )?
        .into()],
    )
}

/// Island props are `noteId` (null for a new note) and `title`, taken from
/// the children's text.
pub fn edit_button(props: Props, children: Vec<Child>) -> Result<Node> {
    let title: String = children.iter().filter_map(Child::as_text).collect();
    let note_id = props.get("noteId").cloned().unwrap_or(PropValue::Null);
    island(
        "EditButton",
        props! { "noteId" => note_id, "title" => title },
        vec![h!(
            "button.edit-button.edit-button--solid",
            props! { "role" => "menuitem" },
            children
        )?
        .into()],
    )
}

/// Search results, or an empty-state message.
pub fn note_list(query: &str, source: &dyn NoteSource) -> Result<Node> {
    let notes = source.search_notes(query)?;
    if notes.is_empty() {
        let text = if query.is_empty() {
            "No notes created yet!".to_string()
        } else {
            format!("Couldn't find any notes titled \"{query}\".")
        };
        return h!("div.notes-empty", text);
    }

    let now = Local::now();
    let items = notes
        .iter()
        .map(|note| h!("li", props! { "key" => &note.id }, sidebar_note(note, now)))
        .collect::<Result<Vec<Node>>>()?;
    h!("ul.notes-list", items)
}

pub fn sidebar_note(note: &Note, now: DateTime<Local>) -> Result<Node> {
    island(
        "SidebarNoteContent",
        props! { "id" => &note.id, "title" => &note.title },
        vec![
            h!(
                "div.sidebar-note-list-item",
                h!(
                    "header.sidebar-note-header",
                    h!("strong", &note.title),
                    h!("small", last_edited(note.updated_at, now))
                ),
                h!("button.sidebar-note-open")
            )?
            .into(),
            slot(vec![h!("p.sidebar-note-excerpt", h!("i", "(No content)"))?.into()])?.into(),
        ],
    )
}

/// `3:04 PM` for edits made today, ` 1/ 2/06`-style dates otherwise.
pub fn last_edited(updated_at: DateTime<Local>, now: DateTime<Local>) -> String {
    if updated_at.date_naive() == now.date_naive() {
        updated_at.format("%-I:%M %p").to_string()
    } else {
        updated_at.format("%-m/%e/%y").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::to_html;
    use crate::notes::{NoteStore, UnavailableSource};
    use crate::StrikeError;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, hh, mm, 0).unwrap()
    }

    #[test]
    fn last_edited_today_shows_time() {
        let now = at(2024, 3, 9, 18, 0);
        assert_eq!(last_edited(at(2024, 3, 9, 15, 4), now), "3:04 PM");
    }

    #[test]
    fn last_edited_other_day_shows_date() {
        let now = at(2024, 3, 9, 18, 0);
        assert_eq!(last_edited(at(2024, 1, 2, 9, 0), now), "1/ 2/24");
        assert_eq!(last_edited(at(2023, 11, 23, 9, 0), now), "11/23/23");
    }

    #[test]
    fn empty_store_message() {
        let node = note_list("", &NoteStore::new()).unwrap();
        assert_eq!(
            to_html(&node).unwrap(),
            r#"<div class="notes-empty">No notes created yet!</div>"#
        );
    }

    #[test]
    fn no_match_message_quotes_query() {
        let node = note_list("zebra", &NoteStore::seeded()).unwrap();
        assert_eq!(
            to_html(&node).unwrap(),
            r#"<div class="notes-empty">Couldn&#39;t find any notes titled &#34;zebra&#34;.</div>"#
        );
    }

    #[test]
    fn note_list_items_are_islands() {
        let node = note_list("meeting", &NoteStore::seeded()).unwrap();
        let html = to_html(&node).unwrap();
        assert!(html.starts_with(
            r#"<ul class="notes-list"><li key="1"><strike-island component-export="SidebarNoteContent""#
        ));
        assert!(html.contains("<strike-slot>"));
    }

    #[test]
    fn edit_button_island_props() {
        let node = h!(edit_button, props! { "noteId" => PropValue::Null }, "New").unwrap();
        let html = to_html(&node).unwrap();
        assert_eq!(
            html,
            r#"<strike-island component-export="EditButton" data-props="{&#34;noteId&#34;:null,&#34;title&#34;:&#34;New&#34;}"><button class="edit-button edit-button--solid" role="menuitem">New</button></strike-island>"#
        );
    }

    #[test]
    fn page_has_root_and_bootstrap() {
        let html = to_html(&page(&Location::new("/", ""), &NoteStore::seeded()).unwrap()).unwrap();
        assert!(html.starts_with(r#"<html lang="en"><head><meta charset="utf-8">"#));
        assert!(html.contains(r#"<div id="root"><nav>"#));
        assert!(html.contains("Loading... /"));
        assert!(html.contains("strike-island {"));
        assert!(html.contains(
            r#"<script src="/static/strike/bootstrap.js" type="module"></script>"#
        ));
        assert!(html.ends_with("</body></html>"));
    }

    #[test]
    fn lookup_failure_fails_the_page() {
        let err = page(&Location::default(), &UnavailableSource("db offline".into())).unwrap_err();
        assert!(matches!(err, StrikeError::Lookup(_)));
    }
}
