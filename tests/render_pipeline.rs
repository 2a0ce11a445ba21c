use spanned_html::{
    Alignment, DisplayMetrics, DocumentBuilder, RenderDiagnostic, RenderedDocument, Run, RunKind,
};

fn render(markup: &str) -> RenderedDocument {
    DocumentBuilder::new(DisplayMetrics::default()).render(markup)
}

fn runs_of<'a>(rendered: &'a RenderedDocument, pred: impl Fn(&RunKind) -> bool + 'a) -> Vec<&'a Run> {
    rendered.document.runs.iter().filter(|r| pred(&r.kind)).collect()
}

#[test]
fn plain_text_passes_through_without_runs() {
    let out = render("hello world");
    assert_eq!(out.document.text, "hello world");
    assert!(out.document.runs.is_empty());
    assert!(out.regions.is_empty());
    assert!(out.diagnostics.is_empty());
}

#[test]
fn empty_and_whitespace_input_render_empty_documents() {
    for markup in ["", "   ", "\n\n"] {
        let out = render(markup);
        assert_eq!(out.document.text, "");
        assert!(out.document.runs.is_empty());
        assert!(out.regions.is_empty());
    }
}

#[test]
fn bold_emits_exactly_one_run_over_its_text() {
    let out = render("<b>x</b>");
    assert_eq!(out.document.text, "x");
    assert_eq!(
        out.document.runs,
        vec![Run {
            start: 0,
            end: 1,
            kind: RunKind::Bold
        }]
    );
}

#[test]
fn inline_styles_nest_and_cover_their_own_ranges() {
    let out = render("a<b>b<i>c</i></b><u>d</u>");
    assert_eq!(out.document.text, "abcd");
    let italics = runs_of(&out, |k| matches!(k, RunKind::Italic));
    let bolds = runs_of(&out, |k| matches!(k, RunKind::Bold));
    let underlines = runs_of(&out, |k| matches!(k, RunKind::Underline));
    assert_eq!((italics[0].start, italics[0].end), (2, 3));
    assert_eq!((bolds[0].start, bolds[0].end), (1, 3));
    assert_eq!((underlines[0].start, underlines[0].end), (3, 4));
}

#[test]
fn strike_and_code_map_to_their_runs() {
    let out = render("<s>a</s><code>b</code><strike>c</strike>");
    assert_eq!(out.document.text, "abc");
    let strikes = runs_of(&out, |k| matches!(k, RunKind::Strikethrough));
    assert_eq!(strikes.len(), 2);
    let mono = runs_of(&out, |k| matches!(k, RunKind::Monospace));
    assert_eq!((mono[0].start, mono[0].end), (1, 2));
}

#[test]
fn paragraphs_are_separated_by_a_single_newline() {
    let out = render("<p>A</p><p>B</p>");
    assert_eq!(out.document.text, "A\nB");
}

#[test]
fn leading_paragraph_adds_no_blank_padding() {
    let out = render("<p>only</p>");
    assert_eq!(out.document.text, "only");
}

#[test]
fn divs_force_block_breaks() {
    let out = render("a<div>b</div>c");
    assert_eq!(out.document.text, "a\nb\nc");
}

#[test]
fn breaks_and_raw_newlines_become_line_breaks() {
    assert_eq!(render("a<br>b").document.text, "a\nb");
    assert_eq!(render("a\nb").document.text, "a\nb");
    assert_eq!(render("a<br/>b").document.text, "a\nb");
}

#[test]
fn interior_whitespace_collapses_to_single_spaces() {
    let out = render("a   b\t\tc");
    assert_eq!(out.document.text, "a b c");
}

#[test]
fn entities_resolve_to_their_characters() {
    let out = render("a &amp; b &lt;c&gt;");
    assert_eq!(out.document.text, "a & b <c>");
}

#[test]
fn trailing_newlines_are_stripped_from_the_result() {
    let out = render("a<br><br>");
    assert_eq!(out.document.text, "a");
}

#[test]
fn center_aligns_its_block() {
    let out = render("<center>a</center>");
    assert_eq!(out.document.text, "a");
    let aligns = runs_of(&out, |k| matches!(k, RunKind::Alignment(Alignment::Center)));
    assert_eq!(aligns.len(), 1);
    assert_eq!((aligns[0].start, aligns[0].end), (0, 1));
}

#[test]
fn paragraph_text_align_style_emits_alignment_run() {
    let out = render(r#"<p style="text-align:center">A</p>"#);
    let aligns = runs_of(&out, |k| matches!(k, RunKind::Alignment(Alignment::Center)));
    assert_eq!(aligns.len(), 1);

    let out = render(r#"<p style="text-align:end">A</p>"#);
    let aligns = runs_of(&out, |k| matches!(k, RunKind::Alignment(Alignment::End)));
    assert_eq!(aligns.len(), 1);
}

#[test]
fn unknown_text_align_is_reported_and_ignored() {
    let out = render(r#"<p style="text-align:justify">A</p>"#);
    assert!(runs_of(&out, |k| matches!(k, RunKind::Alignment(_))).is_empty());
    assert!(out
        .diagnostics
        .iter()
        .any(|d| matches!(d, RenderDiagnostic::MalformedAttribute { tag: "p", .. })));
}

#[test]
fn span_style_emits_color_and_size_runs() {
    let out = render(r#"<span style="color:#336699;font-size:12px">x</span>"#);
    assert_eq!(out.document.text, "x");
    let colors = runs_of(&out, |k| matches!(k, RunKind::ForegroundColor(_)));
    assert_eq!(colors.len(), 1);
    assert_eq!(colors[0].kind, RunKind::ForegroundColor(0xFF33_6699));
    let sizes = runs_of(&out, |k| matches!(k, RunKind::AbsoluteSize { .. }));
    assert_eq!(sizes[0].kind, RunKind::AbsoluteSize { size: 12, dip: true });
}

#[test]
fn span_with_size_only_emits_no_color_run() {
    let out = render(r#"<span style="font-size:14px">x</span>"#);
    assert!(runs_of(&out, |k| matches!(k, RunKind::ForegroundColor(_))).is_empty());
    let sizes = runs_of(&out, |k| matches!(k, RunKind::AbsoluteSize { .. }));
    assert_eq!(sizes[0].kind, RunKind::AbsoluteSize { size: 14, dip: true });
}

#[test]
fn span_unresolvable_color_falls_back_to_black() {
    let out = render(r#"<span style="color:blurple">x</span>"#);
    let colors = runs_of(&out, |k| matches!(k, RunKind::ForegroundColor(_)));
    assert_eq!(colors[0].kind, RunKind::ForegroundColor(0xFF00_0000));
}

#[test]
fn styled_bold_emits_both_color_and_bold() {
    let out = render(r#"<b style="color:green">x</b>"#);
    let colors = runs_of(&out, |k| matches!(k, RunKind::ForegroundColor(_)));
    assert_eq!(colors[0].kind, RunKind::ForegroundColor(0xFF00_8000));
    assert_eq!(runs_of(&out, |k| matches!(k, RunKind::Bold)).len(), 1);
}

#[test]
fn font_color_and_size_resolve() {
    let out = render(r##"<font color="#ff0000" size="9">x</font>"##);
    let colors = runs_of(&out, |k| matches!(k, RunKind::ForegroundColor(_)));
    assert_eq!(colors[0].kind, RunKind::ForegroundColor(0xFFFF_0000));
    // size clamps to 7; default 16px at density 1.0 gives 16 + (7 - 3).
    let sizes = runs_of(&out, |k| matches!(k, RunKind::AbsoluteSize { .. }));
    assert_eq!(sizes[0].kind, RunKind::AbsoluteSize { size: 20, dip: true });
}

#[test]
fn font_size_clamps_at_the_low_end_too() {
    let out = render(r#"<font size="-5">x</font>"#);
    let sizes = runs_of(&out, |k| matches!(k, RunKind::AbsoluteSize { .. }));
    assert_eq!(sizes[0].kind, RunKind::AbsoluteSize { size: 14, dip: true });
}

#[test]
fn font_with_bad_color_reports_and_suppresses_the_run() {
    let out = render(r#"<font color="chartreuse-ish">x</font>"#);
    assert!(runs_of(&out, |k| matches!(k, RunKind::ForegroundColor(_))).is_empty());
    assert!(out.diagnostics.iter().any(|d| matches!(
        d,
        RenderDiagnostic::MalformedAttribute {
            tag: "font",
            attribute: "color",
            ..
        }
    )));
}

#[test]
fn empty_font_element_emits_nothing() {
    let out = render(r##"a<font color="#ff0000"></font>b"##);
    assert_eq!(out.document.text, "ab");
    assert!(out.document.runs.is_empty());
    assert!(out.diagnostics.is_empty());
}

#[test]
fn anchors_emit_link_runs() {
    let out = render(r#"<a href="https://example.com">here</a>"#);
    let links = runs_of(&out, |k| matches!(k, RunKind::Link { .. }));
    assert_eq!(links.len(), 1);
    assert_eq!(
        links[0].kind,
        RunKind::Link {
            href: "https://example.com".into()
        }
    );
}

#[test]
fn anchor_without_href_emits_no_link() {
    let out = render("<a>here</a>");
    assert!(runs_of(&out, |k| matches!(k, RunKind::Link { .. })).is_empty());
    assert_eq!(out.document.text, "here");
}

#[test]
fn unordered_list_items_get_bullets_and_margins() {
    let out = render("<ul><li>a</li><ul><li>b</li></ul></ul>");
    assert_eq!(out.document.text, "a\nb");
    let bullets = runs_of(&out, |k| matches!(k, RunKind::Bullet { .. }));
    assert_eq!(bullets.len(), 2);
    assert_eq!(bullets[0].kind, RunKind::Bullet { gap_width: 10 });
    // Nested bullets counter the marker width of the level above.
    assert_eq!(bullets[1].kind, RunKind::Bullet { gap_width: -8 });
    let margins = runs_of(&out, |k| matches!(k, RunKind::LeadingMargin(_)));
    assert!(margins.iter().any(|r| r.kind == RunKind::LeadingMargin(20)));
}

#[test]
fn ordered_list_ordinals_restart_per_nesting_level() {
    let out = render("<ol><li>a<ol><li>b</li></ol></li><li>c</li></ol>");
    let ordinals: Vec<u32> = out
        .document
        .runs
        .iter()
        .filter_map(|r| match r.kind {
            RunKind::Number { ordinal } => Some(ordinal),
            _ => None,
        })
        .collect();
    // Runs resolve innermost first: nested item 1, outer item 1, outer item 2.
    assert_eq!(ordinals, vec![1, 1, 2]);
}

#[test]
fn unbalanced_close_degrades_with_a_diagnostic() {
    let out = render("</b>x");
    assert_eq!(out.document.text, "x");
    assert!(out
        .diagnostics
        .iter()
        .any(|d| *d == RenderDiagnostic::UnbalancedClose { tag: "b".into() }));
}

#[test]
fn unknown_tags_are_ignored() {
    let out = render("<article>a<aside>b</aside></article>");
    assert_eq!(out.document.text, "ab");
    assert!(out.document.runs.is_empty());
}

#[test]
fn post_transform_rewrites_the_final_text() {
    let out = DocumentBuilder::new(DisplayMetrics::default())
        .post_transform(|text| text.to_uppercase())
        .render("<b>hi</b>");
    assert_eq!(out.document.text, "HI");
    // Runs still describe the pre-transform offsets.
    assert_eq!(out.document.runs[0].kind, RunKind::Bold);
}
