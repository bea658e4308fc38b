use std::fmt::Write;

use crate::media::MediaItem;
use crate::proxy::SizeClass;
use crate::signing::UrlSigner;

pub const MIN_COLS: u32 = 2;
pub const MAX_COLS: u32 = 6;

const ALT_MAX_CHARS: usize = 140;

const GRID_STYLE_HEAD: &str = "<style>
  .ig-grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(140px, 1fr)); gap: 8px; }
  @media (min-width: 900px) { .ig-grid { grid-template-columns: repeat(";

const GRID_STYLE_TAIL: &str = ", 1fr); } }
  .ig-grid a { position: relative; display: block; overflow: hidden; border-radius: 4px; background: #f2f2f2; }
  .ig-grid img { width: 100%; height: 100%; object-fit: cover; display: block; }
</style>
";

/// Render `items` as a responsive grid of links to their posts.
///
/// Image sources go through the proxy when the signer has a secret and fall
/// back to the raw CDN URL otherwise. An empty slice renders the
/// `no items` placeholder; callers with a better reason use [`render_empty`].
pub fn render_grid(items: &[MediaItem], signer: &UrlSigner, cols: u32, size: &str) -> String {
    // Only web links may reach `href`/`src`; `javascript:` and friends are dropped.
    let items: Vec<&MediaItem> = items
        .iter()
        .filter(|item| is_web_url(&item.permalink) && is_web_url(&item.image_url))
        .collect();
    if items.is_empty() {
        return render_empty("no items");
    }

    let cols = cols.clamp(MIN_COLS, MAX_COLS);
    let size = SizeClass::normalize(size);

    let mut html = String::with_capacity(GRID_STYLE_HEAD.len() + items.len() * 256);
    html.push_str(GRID_STYLE_HEAD);
    let _ = write!(html, "{cols}");
    html.push_str(GRID_STYLE_TAIL);
    html.push_str("<div class=\"ig-grid\" aria-label=\"Instagram feed\">\n");

    for item in items {
        let mut src = signer.sign(&item.image_url, size.as_wire());
        if src.is_empty() {
            src = item.image_url.clone();
        }
        let alt: String = item.caption.chars().take(ALT_MAX_CHARS).collect();

        let _ = write!(
            html,
            "  <a href=\"{}\" target=\"_blank\" rel=\"noopener nofollow\"><img src=\"{}\" alt=\"{}\" loading=\"lazy\" decoding=\"async\"></a>\n",
            escape_html(&item.permalink),
            escape_html(&src),
            escape_html(&alt),
        );
    }

    html.push_str("</div>\n");
    html
}

fn is_web_url(raw: &str) -> bool {
    url::Url::parse(raw)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

/// Placeholder emitted instead of an empty grid.
pub fn render_empty(reason: &str) -> String {
    // `--` would end the comment early.
    let reason = escape_html(reason).replace("--", "&#45;&#45;");
    format!("<!-- Instagram feed: {reason} -->")
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
