use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::interaction::InteractionEvent;
use super::render;
use super::state::PersonaGraphState;
use super::types::{GraphNode, PersonaGraph};

/// Drag distance in px below which a press-release counts as a click.
const CLICK_TOLERANCE: f64 = 4.0;

fn window_size(window: &Window) -> Option<(f64, f64)> {
	Some((
		window.inner_width().ok()?.as_f64()?,
		window.inner_height().ok()?.as_f64()?,
	))
}

fn local_position(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?;
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

/// Interactive canvas for a persona graph. Clicking a node hands its full record to `on_activate`.
#[component]
pub fn PersonaGraphCanvas(
	#[prop(into)] data: Signal<PersonaGraph>,
	#[prop(into, default = Signal::stored(false))] show_all_details: Signal<bool>,
	#[prop(optional)] on_activate: Option<Callback<GraphNode>>,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: Rc<RefCell<Option<PersonaGraphState>>> = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (state_init, animate_init, resize_cb_init) =
		(state.clone(), animate.clone(), resize_cb.clone());

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas;
		let Some(window) = web_sys::window() else {
			return;
		};

		let (w, h) = if fullscreen {
			window_size(&window).unwrap_or((800.0, 600.0))
		} else {
			(
				width.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_width() as f64)
						.unwrap_or(800.0)
				}),
				height.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_height() as f64)
						.unwrap_or(600.0)
				}),
			)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let Some(ctx) = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
		else {
			log::error!("2d canvas context unavailable");
			return;
		};
		*state_init.borrow_mut() = Some(PersonaGraphState::new(&data.get_untracked(), w, h));

		if fullscreen {
			let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let Some((nw, nh)) = web_sys::window().as_ref().and_then(window_size) else {
					return;
				};
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				if let Some(ref mut s) = *state_resize.borrow_mut() {
					s.resize(nw, nh);
				}
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let (state_anim, animate_inner) = (state_init.clone(), animate_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			if let Some(ref mut s) = *state_anim.borrow_mut() {
				s.tick(0.016);
				render::render(s, &ctx);
			}
			if let (Some(cb), Some(win)) = (&*animate_inner.borrow(), web_sys::window()) {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	// New snapshots from the persona API.
	let state_data = state.clone();
	Effect::new(move |_| {
		let graph = data.get();
		if let Some(ref mut s) = *state_data.borrow_mut() {
			s.set_graph(graph);
		}
	});

	let state_details = state.clone();
	Effect::new(move |_| {
		let show = show_all_details.get();
		if let Some(ref mut s) = *state_details.borrow_mut() {
			s.engine.dispatch(InteractionEvent::SetShowAllDetails(show));
		}
	});

	let notify = move |nodes: Vec<GraphNode>| {
		if let Some(cb) = on_activate {
			for node in nodes {
				cb.run(node);
			}
		}
	};

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = local_position(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_md.borrow_mut() {
			s.pan.active = true;
			s.pan.moved = false;
			s.pan.start_x = x;
			s.pan.start_y = y;
			s.pan.transform_start_x = s.transform.x;
			s.pan.transform_start_y = s.transform.y;
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = local_position(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_mm.borrow_mut() {
			if s.pan.active {
				let (dx, dy) = (x - s.pan.start_x, y - s.pan.start_y);
				if dx.hypot(dy) > CLICK_TOLERANCE {
					s.pan.moved = true;
				}
				if s.pan.moved {
					s.transform.x = s.pan.transform_start_x + dx;
					s.transform.y = s.pan.transform_start_y + dy;
				}
			} else {
				s.pointer_move(x, y);
			}
		}
	};

	let state_mu = state.clone();
	let on_mouseup = move |ev: MouseEvent| {
		let Some((x, y)) = local_position(canvas_ref, &ev) else {
			return;
		};
		let activated = match *state_mu.borrow_mut() {
			Some(ref mut s) => {
				let clicked = s.pan.active && !s.pan.moved;
				s.pan.active = false;
				if clicked {
					let events = s.click(x, y);
					s.activated(&events)
				} else {
					Vec::new()
				}
			}
			None => Vec::new(),
		};
		notify(activated);
	};

	let state_dc = state.clone();
	let on_dblclick = move |ev: MouseEvent| {
		let Some((x, y)) = local_position(canvas_ref, &ev) else {
			return;
		};
		let activated = match *state_dc.borrow_mut() {
			Some(ref mut s) => {
				let events = s.double_click(x, y);
				s.activated(&events)
			}
			None => Vec::new(),
		};
		notify(activated);
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.pointer_leave();
		}
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = local_position(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_wh.borrow_mut() {
			let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
			s.zoom_at(x, y, factor);
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="persona-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:dblclick=on_dblclick
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}
