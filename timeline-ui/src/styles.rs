#![cfg(target_arch = "wasm32")]

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Node};

const STYLE_TAG_SELECTOR: &str = "style[data-music-timeline]";

/// Default CSS for the component along with easy-to-override design tokens.
pub const DEFAULT_STYLES: &str = r#"
:root {
  --mt-font-family: 'Inter', system-ui, -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
  --mt-bg: #0f172a;
  --mt-surface: #1e293b;
  --mt-text: #e2e8f0;
  --mt-muted: #94a3b8;
  --mt-axis: rgba(148, 163, 184, 0.45);
  --mt-accent: #f59e0b;
  --mt-pin-size: 56px;
  --mt-radius: 12px;
}

.music-timeline {
  font-family: var(--mt-font-family);
  background: var(--mt-bg);
  color: var(--mt-text);
  border-radius: var(--mt-radius);
  padding: 20px;
  position: relative;
}

.timeline-toolbar {
  display: flex;
  justify-content: space-between;
  align-items: flex-start;
  gap: 16px;
  margin-bottom: 16px;
}

.timeline-search {
  position: relative;
  flex: 1;
  max-width: 420px;
}

.timeline-search input {
  width: 100%;
  padding: 10px 14px;
  border-radius: 999px;
  border: 1px solid var(--mt-axis);
  background: var(--mt-surface);
  color: inherit;
}

.search-dropdown {
  position: absolute;
  top: calc(100% + 6px);
  left: 0;
  right: 0;
  z-index: 20;
  list-style: none;
  margin: 0;
  padding: 6px 0;
  background: var(--mt-surface);
  border-radius: var(--mt-radius);
  box-shadow: 0 16px 32px rgba(0, 0, 0, 0.35);
}

.search-hit {
  display: flex;
  justify-content: space-between;
  padding: 8px 14px;
  cursor: pointer;
}

.search-hit:hover {
  background: rgba(245, 158, 11, 0.16);
}

.search-date,
.search-empty {
  color: var(--mt-muted);
}

.search-empty {
  padding: 8px 14px;
}

.timeline-actions {
  display: flex;
  gap: 8px;
}

.timeline-actions button {
  padding: 8px 14px;
  border-radius: 999px;
  border: 1px solid var(--mt-axis);
  background: transparent;
  color: inherit;
  cursor: pointer;
}

.timeline-container {
  position: relative;
  overflow: hidden;
  height: 260px;
  cursor: grab;
  user-select: none;
  touch-action: pan-y;
}

.timeline-container.is-dragging {
  cursor: grabbing;
}

.timeline-canvas {
  position: absolute;
  top: 0;
  bottom: 0;
  left: 0;
  will-change: transform;
}

.timeline-axis {
  position: absolute;
  left: 0;
  right: 0;
  top: 180px;
  height: 2px;
  background: var(--mt-axis);
}

.year-marker {
  position: absolute;
  top: 170px;
  height: 22px;
  border-left: 2px solid var(--mt-text);
}

.year-label {
  position: absolute;
  top: 28px;
  left: -18px;
  font-size: 13px;
  font-weight: 600;
}

.month-marker {
  position: absolute;
  top: 175px;
  height: 12px;
  border-left: 1px solid var(--mt-axis);
}

.dense-months .month-marker {
  height: 6px;
  top: 178px;
  opacity: 0.35;
}

.album-marker {
  position: absolute;
  top: 100px;
  display: flex;
  transform: translateX(-50%);
  transition: opacity 0.2s ease;
}

.album-marker.is-cluster .album-pin + .album-pin {
  margin-left: calc(var(--mt-pin-size) * -0.6);
}

.album-marker.is-dimmed {
  opacity: 0.25;
}

.cluster-count {
  position: absolute;
  top: -10px;
  right: -10px;
  z-index: 2;
  min-width: 20px;
  padding: 2px 6px;
  border-radius: 999px;
  background: var(--mt-accent);
  color: #111827;
  font-size: 12px;
  font-weight: 700;
  text-align: center;
}

.album-pin {
  position: relative;
  width: var(--mt-pin-size);
  height: var(--mt-pin-size);
  padding: 0;
  border: 2px solid var(--mt-surface);
  border-radius: 8px;
  background: var(--mt-surface);
  overflow: hidden;
  cursor: pointer;
}

.album-pin.is-match {
  border-color: var(--mt-accent);
}

.album-pin img {
  width: 100%;
  height: 100%;
  object-fit: cover;
}

.pin-placeholder {
  font-size: 26px;
  line-height: var(--mt-pin-size);
}

.pin-glyph {
  position: absolute;
  bottom: 2px;
  right: 2px;
  padding: 0 4px;
  border-radius: 4px;
  background: rgba(15, 23, 42, 0.8);
  font-size: 10px;
  font-weight: 700;
}

.pin-glyph[data-type="single"] {
  color: var(--mt-accent);
}

.album-preview {
  position: fixed;
  z-index: 30;
  display: flex;
  flex-direction: column;
  gap: 4px;
  width: 180px;
  padding: 10px;
  border-radius: var(--mt-radius);
  background: var(--mt-surface);
  box-shadow: 0 16px 32px rgba(0, 0, 0, 0.4);
  pointer-events: none;
}

.album-preview img {
  width: 100%;
  border-radius: 8px;
}

.album-preview span {
  color: var(--mt-muted);
  font-size: 12px;
}

@media (max-width: 640px) {
  .timeline-toolbar {
    flex-direction: column;
    align-items: stretch;
  }

  .timeline-search {
    max-width: none;
  }

  .music-timeline {
    --mt-pin-size: 44px;
    padding: 12px;
  }
}
"#;

pub fn ensure_styles(document: &Document) -> Result<(), JsValue> {
    if document.query_selector(STYLE_TAG_SELECTOR)?.is_some() {
        return Ok(());
    }

    let head = document
        .head()
        .ok_or_else(|| JsValue::from_str("Document không có thẻ <head>"))?;

    let style_el = document.create_element("style")?;
    style_el.set_attribute("data-music-timeline", "v1")?;
    style_el.set_text_content(Some(DEFAULT_STYLES));
    head.append_child(&style_el.dyn_into::<Node>()?)?;

    Ok(())
}
