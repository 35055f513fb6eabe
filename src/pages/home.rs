use leptos::prelude::*;

use crate::components::persona_graph::{GraphEdge, GraphNode, Layer, PersonaGraph, PersonaGraphCanvas};

/// One story with its details, as (title, [details]).
type StorySeed = (&'static str, &'static [&'static str]);

const ANGLES: [(&str, &[StorySeed]); 3] = [
	(
		"Curiosity across borders",
		&[
			("Exchange week in Kyoto", &["Hosted by a ceramics family", "Learned 200 kanji in a month"]),
			("Translating for my grandmother", &["Weekly clinic visits"]),
			("Model UN delegate", &[]),
			("Language tandem club founder", &["Thirty members after one term", "Ran it bilingually"]),
			("Volunteer at the refugee centre", &["Taught basic maths"]),
			("Summer at the Goethe-Institut", &["B2 certificate"]),
		],
	),
	(
		"Building things that work",
		&[
			("Robotics team lead", &["Regional finalist", "Rewrote the drive code", "Mentored two juniors"]),
			("Fixing bikes for the neighbourhood", &["Forty bikes repaired"]),
		],
	),
	(
		"Quiet leadership",
		&[("Organizing the school food drive", &["Two tonnes collected"])],
	),
];

fn slug(text: &str) -> String {
	text.chars()
		.filter_map(|c| match c {
			c if c.is_ascii_alphanumeric() => Some(c.to_ascii_lowercase()),
			' ' | '-' => Some('-'),
			_ => None,
		})
		.collect()
}

/// Sample study-abroad persona: one angle carries enough stories to collapse into a cluster.
fn sample_persona() -> PersonaGraph {
	let mut profile = GraphNode::new("profile", Layer::Profile, None, "Maya Chen");
	profile.content = "Applicant for a semester abroad in Berlin.".into();
	profile.confidence = 0.8;
	let mut nodes = vec![profile];
	let mut edges = Vec::new();

	for (a, (angle_title, stories)) in ANGLES.iter().enumerate() {
		let angle_id = format!("angle-{}", slug(angle_title));
		let mut angle = GraphNode::new(&angle_id, Layer::Angle, Some("profile"), *angle_title);
		angle.confidence = 0.9 - a as f64 * 0.2;
		angle.tags = vec!["angle".into()];
		edges.push(GraphEdge::linking("profile", &angle_id));
		nodes.push(angle);

		for (s, (story_title, details)) in stories.iter().enumerate() {
			let story_id = format!("{angle_id}/{}", slug(story_title));
			let mut story = GraphNode::new(&story_id, Layer::Story, Some(angle_id.as_str()), *story_title);
			story.confidence = 1.0 - s as f64 * 0.1;
			story.tags = vec!["story".into()];
			edges.push(GraphEdge::linking(&angle_id, &story_id));
			nodes.push(story);

			for detail_title in details.iter() {
				let detail_id = format!("{story_id}/{}", slug(detail_title));
				let mut detail = GraphNode::new(&detail_id, Layer::Detail, Some(story_id.as_str()), *detail_title);
				detail.content = format!("Detail behind \"{story_title}\".");
				detail.confidence = 0.6;
				edges.push(GraphEdge::linking(&story_id, &detail_id));
				nodes.push(detail);
			}
		}
	}

	PersonaGraph { nodes, edges }
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let persona = sample_persona();
	let (active, set_active) = signal(None::<GraphNode>);
	let (show_all_details, set_show_all_details) = signal(false);

	let on_activate = Callback::new(move |node: GraphNode| set_active.set(Some(node)));
	let graph_data = Signal::stored(persona);

	let detail_panel = move || {
		active.get().map(|node| {
			let confidence = format!("{:.0}%", node.confidence * 100.0);
			view! {
				<aside class="node-detail">
					<h2>{node.title}</h2>
					<p>{node.content}</p>
					<ul class="tags">
						{node.tags.into_iter().map(|t| view! { <li>{t}</li> }).collect_view()}
					</ul>
					<p class="confidence">"Confidence: " {confidence}</p>
				</aside>
			}
		})
	};

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="fullscreen-graph">
				<PersonaGraphCanvas
					data=graph_data
					show_all_details=show_all_details
					on_activate=on_activate
					fullscreen=true
				/>
				<div class="graph-overlay">
					<h1>"Persona Graph"</h1>
					<p class="subtitle">
						"Hover a story to see its details. Click a badge to expand. Double-click to re-center."
					</p>
					<label>
						<input
							type="checkbox"
							prop:checked=show_all_details
							on:change=move |ev| set_show_all_details.set(event_target_checked(&ev))
						/>
						" Show all details"
					</label>
				</div>
				{detail_panel}
			</div>
		</ErrorBoundary>
	}
}
