//! Thành phần giao diện timeline âm nhạc cho môi trường WebAssembly.

#[cfg(target_arch = "wasm32")]
mod styles;

#[cfg(target_arch = "wasm32")]
mod wasm_ui {
    use std::rc::Rc;

    use crate::styles;
    use chrono::{Datelike, Utc};
    use serde_wasm_bindgen::from_value;
    use timeline_core::{
        navigation, timeline_range, Album, AlbumMarker, AlbumPin, PreviewCard, ReleaseDate,
        SearchResults, Thumbnail, TimelineConfig, TimelineLayout, Viewport,
    };
    use wasm_bindgen::prelude::*;
    use web_sys::{console, Document, Element, HtmlElement, HtmlInputElement, Window};
    use yew::events::InputEvent;
    use yew::prelude::*;
    use yew::{AppHandle, TargetCast};

    #[derive(Properties, PartialEq)]
    pub struct TimelineViewProps {
        pub albums: Rc<Vec<Album>>,
        pub config: TimelineConfig,
        pub today: ReleaseDate,
    }

    #[function_component(TimelineView)]
    fn timeline_view(props: &TimelineViewProps) -> Html {
        use_effect_with((), |_| {
            if let Some(document) = web_sys::window().and_then(|window| window.document()) {
                if let Err(err) = styles::ensure_styles(&document) {
                    console::error_1(&err);
                }
            }
            || ()
        });

        let config = &props.config;
        let mapper = config.mapper();
        let viewport = use_state(|| Viewport::new(config));
        let preview = use_state(|| None::<PreviewCard>);
        let dropdown_open = use_state(|| false);
        let container = use_node_ref();
        let centred = use_mut_ref(|| false);

        let albums = props.albums.clone();
        let range = timeline_range(&albums, props.today.year, config);
        let mut layout = TimelineLayout::build(&albums, range, viewport.zoom(), &mapper);
        layout.highlight(&albums, viewport.query());
        let results = SearchResults::collect(&albums, viewport.query(), config.search_result_limit);

        {
            // Container or canvas size changed: re-clamp, and centre on today once.
            let viewport = viewport.clone();
            let container = container.clone();
            let today = props.today;
            let origin = layout.origin;
            let mapper = mapper;
            use_effect_with(layout.width, move |width| {
                if let Some(element) = container.cast::<HtmlElement>() {
                    let mut next = (*viewport).clone();
                    next.resize(f64::from(element.client_width()), *width);
                    if !*centred.borrow() {
                        next.jump_to(today, origin, &mapper);
                        *centred.borrow_mut() = true;
                    }
                    if next != *viewport {
                        viewport.set(next);
                    }
                }
                || ()
            });
        }

        let update = {
            let viewport = viewport.clone();
            move |change: &dyn Fn(&mut Viewport)| {
                let mut next = (*viewport).clone();
                change(&mut next);
                viewport.set(next);
            }
        };

        let on_wheel = {
            let update = update.clone();
            Callback::from(move |event: WheelEvent| {
                event.prevent_default();
                update(&|viewport| {
                    viewport.wheel(event.delta_y());
                });
            })
        };

        let on_mouse_down = {
            let update = update.clone();
            Callback::from(move |event: MouseEvent| {
                let x = f64::from(event.client_x());
                update(&|viewport| viewport.begin_drag(x));
            })
        };

        let on_mouse_move = {
            let update = update.clone();
            let dragging = viewport.is_dragging();
            Callback::from(move |event: MouseEvent| {
                if dragging {
                    event.prevent_default();
                    let x = f64::from(event.client_x());
                    update(&|viewport| viewport.drag_to(x));
                }
            })
        };

        let on_mouse_end = {
            let update = update.clone();
            let dragging = viewport.is_dragging();
            Callback::from(move |_: MouseEvent| {
                if dragging {
                    update(&|viewport| viewport.end_drag());
                }
            })
        };

        let on_touch_start = {
            let update = update.clone();
            Callback::from(move |event: TouchEvent| {
                if let Some(touch) = event.touches().get(0) {
                    let x = f64::from(touch.client_x());
                    update(&|viewport| viewport.begin_drag(x));
                }
            })
        };

        let on_touch_move = {
            let update = update.clone();
            Callback::from(move |event: TouchEvent| {
                if let Some(touch) = event.touches().get(0) {
                    let x = f64::from(touch.client_x());
                    update(&|viewport| viewport.drag_to(x));
                }
            })
        };

        let on_touch_end = {
            let update = update.clone();
            Callback::from(move |_: TouchEvent| update(&|viewport| viewport.end_drag()))
        };

        let on_search = {
            let update = update.clone();
            let dropdown_open = dropdown_open.clone();
            Callback::from(move |event: InputEvent| {
                let input: HtmlInputElement = event.target_unchecked_into();
                let query = input.value();
                dropdown_open.set(!query.trim().is_empty());
                update(&|viewport| viewport.set_query(query.clone()));
            })
        };

        let on_zoom = {
            let update = update.clone();
            let mapper = mapper;
            Callback::from(move |_: MouseEvent| {
                update(&|viewport| {
                    viewport.cycle_zoom(|zoom| range.width(&mapper, zoom));
                });
            })
        };

        let on_today = {
            let update = update.clone();
            let today = props.today;
            let mapper = mapper;
            let origin = layout.origin;
            Callback::from(move |_: MouseEvent| {
                update(&|viewport| viewport.jump_to(today, origin, &mapper));
            })
        };

        let on_pick = {
            let update = update.clone();
            let dropdown_open = dropdown_open.clone();
            let positions: Vec<(String, f64)> = results
                .hits
                .iter()
                .filter_map(|hit| {
                    layout
                        .marker_for(&hit.album_id)
                        .map(|marker| (hit.album_id.clone(), marker.x()))
                })
                .collect();
            Callback::from(move |album_id: String| {
                dropdown_open.set(false);
                if let Some((_, x)) = positions.iter().find(|(id, _)| *id == album_id) {
                    let x = *x;
                    update(&|viewport| viewport.center_on(x));
                }
            })
        };

        let on_hover = {
            let preview = preview.clone();
            let albums = albums.clone();
            Callback::from(move |(album_id, x, y): (String, f64, f64)| {
                let card = albums
                    .iter()
                    .find(|album| album.id == album_id)
                    .map(|album| PreviewCard::at_pointer(album, x, y));
                preview.set(card);
            })
        };

        let on_leave = {
            let preview = preview.clone();
            Callback::from(move |_: ()| preview.set(None))
        };

        let canvas_style = format!(
            "width: {:.0}px; transform: translateX({:.1}px);",
            layout.width,
            -viewport.scroll_left()
        );
        // Month ticks are always drawn; CSS fades them when they crowd together.
        let dense_months = viewport.zoom() < 0.5;

        html! {
            <div class="music-timeline">
                <header class="timeline-toolbar">
                    <div class="timeline-search">
                        <input
                            type="search"
                            placeholder="Search albums, singles, years"
                            value={viewport.query().to_string()}
                            oninput={on_search}
                            aria-label="Search the timeline"
                        />
                        { if *dropdown_open { render_dropdown(&results, on_pick) } else { Html::default() } }
                    </div>
                    <div class="timeline-actions">
                        <button type="button" onclick={on_zoom}>
                            { format!("Zoom {}x", viewport.zoom()) }
                        </button>
                        <button type="button" onclick={on_today}>{"Today"}</button>
                    </div>
                </header>
                <div
                    ref={container}
                    class={classes!("timeline-container", viewport.is_dragging().then_some("is-dragging"))}
                    onwheel={on_wheel}
                    onmousedown={on_mouse_down}
                    onmousemove={on_mouse_move}
                    onmouseup={on_mouse_end.clone()}
                    onmouseleave={on_mouse_end}
                    ontouchstart={on_touch_start}
                    ontouchmove={on_touch_move}
                    ontouchend={on_touch_end}
                >
                    <div
                        class={classes!("timeline-canvas", dense_months.then_some("dense-months"))}
                        style={canvas_style}
                    >
                        <div class="timeline-axis"></div>
                        { for layout.years.iter().map(|year| html! {
                            <div class="year-marker" style={format!("left: {:.1}px;", year.x)}>
                                <span class="year-label">{ year.label.clone() }</span>
                            </div>
                        }) }
                        { for layout.months.iter().map(|month| html! {
                            <div
                                class="month-marker"
                                data-month={month.month.to_string()}
                                style={format!("left: {:.1}px;", month.x)}
                            ></div>
                        }) }
                        { for layout.markers.iter().map(|marker| render_marker(marker, &on_hover, &on_leave)) }
                    </div>
                </div>
                { (*preview).as_ref().map(render_preview).unwrap_or_default() }
            </div>
        }
    }

    fn render_dropdown(results: &SearchResults, on_pick: Callback<String>) -> Html {
        if results.no_results {
            return html! {
                <ul class="search-dropdown">
                    <li class="search-empty">{ format!("No albums match \"{}\"", results.query) }</li>
                </ul>
            };
        }

        html! {
            <ul class="search-dropdown">
                { for results.hits.iter().map(|hit| {
                    let album_id = hit.album_id.clone();
                    let on_pick = on_pick.clone();
                    html! {
                        <li class="search-hit" onclick={Callback::from(move |_: MouseEvent| on_pick.emit(album_id.clone()))}>
                            <span class="search-title">{ hit.title.clone() }</span>
                            <span class="search-date">{ hit.date_label.clone() }</span>
                        </li>
                    }
                }) }
            </ul>
        }
    }

    fn render_marker(
        marker: &AlbumMarker,
        on_hover: &Callback<(String, f64, f64)>,
        on_leave: &Callback<()>,
    ) -> Html {
        let style = format!("left: {:.1}px;", marker.x());
        let class = classes!(
            "album-marker",
            marker.is_cluster().then_some("is-cluster"),
            marker.is_dimmed().then_some("is-dimmed")
        );

        html! {
            <div class={class} style={style}>
                {
                    if marker.is_cluster() {
                        html! { <span class="cluster-count">{ marker.count() }</span> }
                    } else {
                        Html::default()
                    }
                }
                { for marker.pins().iter().map(|pin| render_pin(pin, on_hover, on_leave)) }
            </div>
        }
    }

    fn render_pin(pin: &AlbumPin, on_hover: &Callback<(String, f64, f64)>, on_leave: &Callback<()>) -> Html {
        let album_id = pin.album_id.clone();
        let onclick = Callback::from(move |event: MouseEvent| {
            event.stop_propagation();
            open_album(&album_id);
        });
        // Presses on a pin must not start a drag.
        let onmousedown = Callback::from(|event: MouseEvent| event.stop_propagation());
        let onmouseenter = {
            let on_hover = on_hover.clone();
            let album_id = pin.album_id.clone();
            Callback::from(move |event: MouseEvent| {
                on_hover.emit((
                    album_id.clone(),
                    f64::from(event.client_x()),
                    f64::from(event.client_y()),
                ))
            })
        };
        let onmouseleave = {
            let on_leave = on_leave.clone();
            Callback::from(move |_: MouseEvent| on_leave.emit(()))
        };

        let thumbnail = match &pin.thumbnail {
            Thumbnail::Image(url) => html! { <img src={url.clone()} alt={pin.title.clone()} loading="lazy" /> },
            Thumbnail::Placeholder => {
                html! { <span class="pin-placeholder">{ timeline_core::layout::PLACEHOLDER_GLYPH }</span> }
            }
        };

        html! {
            <button
                type="button"
                class={classes!("album-pin", pin.matched.then_some("is-match"))}
                title={pin.title.clone()}
                {onclick}
                {onmousedown}
                {onmouseenter}
                {onmouseleave}
            >
                { thumbnail }
                <span class="pin-glyph" data-type={pin.album_type.as_str()}>{ pin.glyph.to_string() }</span>
            </button>
        }
    }

    fn render_preview(card: &PreviewCard) -> Html {
        let style = format!("left: {:.0}px; top: {:.0}px;", card.left, card.top);
        html! {
            <div class="album-preview" style={style}>
                {
                    card.image_url
                        .as_ref()
                        .map(|url| html! { <img src={url.clone()} alt={card.title.clone()} /> })
                        .unwrap_or_default()
                }
                <strong>{ card.title.clone() }</strong>
                <span>{ card.date_label.clone() }</span>
            </div>
        }
    }

    fn open_album(album_id: &str) {
        let href = navigation::album_link(album_id);
        if let Some(window) = web_sys::window() {
            if let Err(err) = window.location().set_href(&href) {
                console::error_1(&err);
            }
        }
    }

    fn decode_albums(albums: JsValue) -> Result<Rc<Vec<Album>>, JsValue> {
        let value: serde_json::Value = from_value(albums)?;
        let albums = timeline_firestore::albums_from_value(&value)
            .map_err(|err| JsValue::from_str(&format!("Dữ liệu album lỗi: {err}")))?;
        Ok(Rc::new(timeline_core::reconcile_albums(albums)))
    }

    /// Handle trả về cho trang; mỗi snapshot mới được đẩy vào qua `push_snapshot`.
    #[wasm_bindgen]
    pub struct TimelineHandle {
        app: AppHandle<TimelineView>,
        config: TimelineConfig,
        today: ReleaseDate,
    }

    #[wasm_bindgen]
    impl TimelineHandle {
        /// Thay toàn bộ danh sách album bằng snapshot mới.
        pub fn push_snapshot(&mut self, albums: JsValue) -> Result<(), JsValue> {
            let albums = decode_albums(albums)?;
            self.app.update(TimelineViewProps {
                albums,
                config: self.config.clone(),
                today: self.today,
            });
            Ok(())
        }
    }

    #[wasm_bindgen]
    pub fn mount_timeline_view(
        selector: &str,
        albums: JsValue,
        config: Option<String>,
    ) -> Result<TimelineHandle, JsValue> {
        let window: Window =
            web_sys::window().ok_or_else(|| JsValue::from_str("Không có window"))?;
        let document: Document = window
            .document()
            .ok_or_else(|| JsValue::from_str("Không truy cập được document"))?;

        let target: Element = document
            .query_selector(selector)
            .map_err(|err| JsValue::from_str(&format!("Selector lỗi: {err:?}")))?
            .ok_or_else(|| JsValue::from_str("Không tìm thấy element theo selector"))?;

        let config = match config {
            Some(raw) => TimelineConfig::from_json_str(&raw)
                .map_err(|err| JsValue::from_str(&format!("Config lỗi: {err}")))?,
            None => TimelineConfig::default(),
        };
        let now = Utc::now();
        let today = ReleaseDate::new(now.month(), now.year())
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        let albums = decode_albums(albums)?;

        let app = yew::Renderer::<TimelineView>::with_root_and_props(
            target,
            TimelineViewProps {
                albums,
                config: config.clone(),
                today,
            },
        )
        .render();
        Ok(TimelineHandle { app, config, today })
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm_ui::{mount_timeline_view, TimelineHandle};

#[cfg(not(target_arch = "wasm32"))]
pub fn mount_timeline_view(
    _: &str,
    _: wasm_bindgen::JsValue,
    _: Option<String>,
) -> Result<(), wasm_bindgen::JsValue> {
    Err(wasm_bindgen::JsValue::from_str(
        "timeline-ui chỉ hỗ trợ biên dịch target wasm32",
    ))
}
