//! JavaScript run inside rendered pages.

/// Opens collapsed navigation groups so their children appear in the DOM.
///
/// Covers the common framework mechanisms: `<details>` elements, toggles
/// carrying `aria-expanded="false"`, and Docusaurus-style collapsed menu
/// categories. Returns the number of groups it opened so the renderer can
/// decide whether another settle pass is worthwhile.
pub const EXPAND_NAV_GROUPS_SCRIPT: &str = r#"
    (() => {
        let expanded = 0;

        document.querySelectorAll('aside details:not([open]), nav details:not([open])')
            .forEach(d => { d.open = true; expanded += 1; });

        document.querySelectorAll(
            'aside [aria-expanded="false"], nav [aria-expanded="false"], .menu [aria-expanded="false"]'
        ).forEach(el => {
            el.click();
            expanded += 1;
        });

        document.querySelectorAll('.menu__list-item--collapsed > .menu__link--sublist')
            .forEach(el => {
                el.click();
                expanded += 1;
            });

        return expanded;
    })()
"#;

/// Reports whether the document has finished loading.
pub const READY_STATE_SCRIPT: &str = r#"
    (() => ({
        readyState: document.readyState,
        bodyExists: document.body !== null
    }))()
"#;
