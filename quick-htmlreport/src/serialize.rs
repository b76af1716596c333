// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serialize a `Report`.
//!
//! The document is XHTML: every free-text value has characters XML forbids removed and goes
//! through `quick-xml`'s text or attribute escaping. The only unescaped content is the fixed
//! stylesheet and script below.

use crate::{
    CaseRow, CaseStatus, ClassRow, PassRate, Report, RowId, Screenshot, errors::SerializeError,
    report::strip_invalid_chars,
};
use quick_xml::{
    Writer,
    events::{BytesEnd, BytesStart, BytesText, Event},
};
use std::{io, time::Duration};

static XHTML_NS: &str = "http://www.w3.org/1999/xhtml";

static HTML_TAG: &str = "html";
static HEAD_TAG: &str = "head";
static BODY_TAG: &str = "body";
static DIV_TAG: &str = "div";
static P_TAG: &str = "p";
static A_TAG: &str = "a";
static TABLE_TAG: &str = "table";
static TR_TAG: &str = "tr";
static TD_TAG: &str = "td";
static PRE_TAG: &str = "pre";

static HIDDEN_ROW: &str = "hiddenRow";

static STYLESHEET: &str = r#"
body        { font-family: Tahoma, arial, helvetica, sans-serif; padding: 20px; font-size: 80%; }
table       { font-size: 100%; border-collapse: collapse; width: 100%; }
td          { border: 1px solid #ddd; padding: 4px 8px; }
.heading .description { margin-top: 4ex; margin-bottom: 6ex; }
.btn        { display: inline-block; padding: 4px 10px; margin-right: 4px; border-radius: 3px; color: #fff; text-decoration: none; border: none; }
.btn-primary { background: #337ab7; }
.btn-success { background: #5cb85c; }
.btn-danger  { background: #d9534f; }
.btn-warning { background: #f0ad4e; }
.btn-info    { background: #5bc0de; }
.text-center { text-align: center; }
#header_row, #total_row { font-weight: bold; }
.passClass  { background-color: #dff0d8; }
.failClass  { background-color: #f2dede; }
.errorClass { background-color: #fcf8e3; }
.passCase   { color: #5cb85c; }
.failCase   { color: #d9534f; font-weight: bold; }
.errorCase  { color: #f0ad4e; font-weight: bold; }
.hiddenRow  { display: none; }
.testcase   { margin-left: 2em; }
.collapse   { display: none; }
.collapse.in { display: block; }
pre         { text-align: left; white-space: pre-wrap; }
"#;

// Row identifiers are `<p|f|e>t<class>_<position>`, see `RowId`.
static SCRIPT: &str = r#"
//<![CDATA[
/* 0: summary, 1: failed, 2: passed, 3: errored, 4: all */
function showCase(level) {
    var rows = document.getElementsByTagName("tr");
    for (var i = 0; i < rows.length; i++) {
        var kind = rows[i].id.substr(0, 2);
        if (kind != "pt" && kind != "ft" && kind != "et") {
            continue;
        }
        var show = level == 4
            || (level == 1 && kind == "ft")
            || (level == 2 && kind == "pt")
            || (level == 3 && kind == "et");
        rows[i].className = show ? "" : "hiddenRow";
    }
    var details = document.getElementsByClassName("detail");
    for (var i = 0; i < details.length; i++) {
        details[i].innerHTML = level == 0 ? "Detail" : "Collapse";
    }
}

function showClassDetail(cid, count) {
    var ids = [];
    var toHide = true;
    for (var i = 0; i < count; i++) {
        var base = "t" + cid.substr(1) + "_" + (i + 1);
        var prefixes = ["f", "p", "e"];
        for (var j = 0; j < prefixes.length; j++) {
            var row = document.getElementById(prefixes[j] + base);
            if (row) {
                ids.push(prefixes[j] + base);
                if (row.className) {
                    toHide = false;
                }
                break;
            }
        }
    }
    for (var i = 0; i < ids.length; i++) {
        document.getElementById(ids[i]).className = toHide ? "hiddenRow" : "";
    }
    document.getElementById(cid).innerHTML = toHide ? "Detail" : "Collapse";
}

function toggleOutput(id) {
    var panel = document.getElementById(id);
    panel.className = panel.className == "collapse" ? "collapse in" : "collapse";
}
//]]>
"#;

pub(crate) fn serialize_report(
    report: &Report,
    writer: impl io::Write,
) -> Result<(), SerializeError> {
    let mut writer = Writer::new_with_indent(writer, b' ', 2);

    writer.write_event(Event::DocType(BytesText::from_escaped("html")))?;

    serialize_report_impl(report, &mut writer)?;

    // Add a trailing newline.
    writer.write_indent()?;
    Ok(())
}

pub(crate) fn serialize_report_impl(
    report: &Report,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    // Use the destructuring syntax to ensure that all fields are handled.
    let Report {
        title,
        generator,
        description,
        attributes,
        screenshots,
        tests,
        passed,
        failed,
        errored,
        time,
        class_rows,
    } = report;
    let pass_rate = PassRate::new(*passed, *tests);

    serialize_start_tag(HTML_TAG, &[("xmlns", XHTML_NS)], writer)?;

    serialize_start_tag(HEAD_TAG, &[], writer)?;
    serialize_text_element("title", &[], title, writer)?;
    serialize_empty_tag("meta", &[("name", "generator"), ("content", generator.as_str())], writer)?;
    serialize_empty_tag(
        "meta",
        &[
            ("http-equiv", "Content-Type"),
            ("content", "text/html; charset=UTF-8"),
        ],
        writer,
    )?;
    serialize_raw_element("style", &[("type", "text/css")], STYLESHEET, writer)?;
    serialize_raw_element("script", &[("type", "text/javascript")], SCRIPT, writer)?;
    serialize_end_tag(HEAD_TAG, writer)?;

    serialize_start_tag(BODY_TAG, &[], writer)?;

    // Heading.
    serialize_start_tag(DIV_TAG, &[("class", "heading")], writer)?;
    serialize_text_element("h1", &[], title, writer)?;
    for attribute in attributes {
        serialize_start_tag(P_TAG, &[("class", "attribute")], writer)?;
        serialize_text_element("strong", &[], &format!("{} : ", attribute.name), writer)?;
        serialize_text(&attribute.value, writer)?;
        serialize_end_tag(P_TAG, writer)?;
    }
    serialize_text_element(P_TAG, &[("class", "description")], description, writer)?;
    serialize_end_tag(DIV_TAG, writer)?;

    // Filter bar.
    serialize_start_tag(P_TAG, &[("id", "show_detail_line")], writer)?;
    for (level, class, label) in [
        (0, "btn btn-primary", format!("Summary {{ {pass_rate} }}")),
        (2, "btn btn-success", format!("Passed {{ {passed} }}")),
        (1, "btn btn-danger", format!("Failed {{ {failed} }}")),
        (3, "btn btn-warning", format!("Errored {{ {errored} }}")),
        (4, "btn btn-info", format!("All {{ {tests} }}")),
    ] {
        let href = format!("javascript:showCase({level})");
        serialize_text_element(
            A_TAG,
            &[("class", class), ("href", href.as_str())],
            &label,
            writer,
        )?;
    }
    serialize_end_tag(P_TAG, writer)?;

    // Results table.
    serialize_start_tag(TABLE_TAG, &[("id", "result_table")], writer)?;
    serialize_start_tag(TR_TAG, &[("id", "header_row"), ("class", "text-center")], writer)?;
    for header in [
        "Test Group / Test Case",
        "Count",
        "Passed",
        "Failed",
        "Errored",
        "Time",
        "View",
    ] {
        serialize_text_element(TD_TAG, &[], header, writer)?;
    }
    serialize_end_tag(TR_TAG, writer)?;

    for (index, class_row) in class_rows.iter().enumerate() {
        serialize_class_row(class_row, index + 1, *screenshots, writer)?;
    }

    serialize_start_tag(TR_TAG, &[("id", "total_row"), ("class", "text-center")], writer)?;
    for cell in [
        "Total".to_owned(),
        tests.to_string(),
        passed.to_string(),
        failed.to_string(),
        errored.to_string(),
        serialize_time(time),
        format!("Pass rate: {pass_rate}"),
    ] {
        serialize_text_element(TD_TAG, &[], &cell, writer)?;
    }
    serialize_end_tag(TR_TAG, writer)?;
    serialize_end_tag(TABLE_TAG, writer)?;

    // Ending.
    serialize_text_element(DIV_TAG, &[("id", "ending")], " ", writer)?;
    serialize_start_tag(DIV_TAG, &[("class", "back-to-top")], writer)?;
    serialize_text_element(A_TAG, &[("href", "#")], "Top", writer)?;
    serialize_end_tag(DIV_TAG, writer)?;

    serialize_end_tag(BODY_TAG, writer)?;
    serialize_end_tag(HTML_TAG, writer)?;

    Ok(())
}

fn serialize_class_row(
    class_row: &ClassRow,
    seq: usize,
    screenshots: bool,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let ClassRow {
        name: _,
        description: _,
        tests,
        passed,
        failed,
        errored,
        time,
        case_rows,
    } = class_row;

    let id = RowId::Class { seq }.to_string();
    let class = format!("{} warning", class_row.style().class_css());
    serialize_start_tag(TR_TAG, &[("class", class.as_str())], writer)?;
    serialize_text_element(TD_TAG, &[], &class_row.display_name(), writer)?;
    for count in [tests, passed, failed, errored] {
        serialize_text_element(TD_TAG, &[("class", "text-center")], &count.to_string(), writer)?;
    }
    serialize_text_element(TD_TAG, &[("class", "text-center")], &serialize_time(time), writer)?;
    serialize_start_tag(TD_TAG, &[("class", "text-center")], writer)?;
    let href = format!("javascript:showClassDetail('{id}',{tests})");
    serialize_text_element(
        A_TAG,
        &[("href", href.as_str()), ("class", "detail"), ("id", id.as_str())],
        "Detail",
        writer,
    )?;
    serialize_end_tag(TD_TAG, writer)?;
    serialize_end_tag(TR_TAG, writer)?;

    for (index, case_row) in case_rows.iter().enumerate() {
        let id = RowId::Case {
            status: case_row.status,
            class_seq: seq,
            pos: index + 1,
        };
        serialize_case_row(case_row, id, screenshots, writer)?;
    }

    Ok(())
}

fn serialize_case_row(
    case_row: &CaseRow,
    id: RowId,
    screenshots: bool,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let CaseRow {
        name: _,
        description: _,
        status,
        output,
        screenshot,
    } = case_row;

    let id = id.to_string();
    let style = status.style().case_css();

    let mut tr_attrs = vec![("id", id.as_str())];
    if case_row.starts_hidden() {
        tr_attrs.push(("class", HIDDEN_ROW));
    }
    serialize_start_tag(TR_TAG, &tr_attrs, writer)?;

    serialize_start_tag(TD_TAG, &[("class", style)], writer)?;
    serialize_text_element(DIV_TAG, &[("class", "testcase")], &case_row.display_name(), writer)?;
    serialize_end_tag(TD_TAG, writer)?;

    serialize_start_tag(TD_TAG, &[("colspan", "5"), ("align", "center")], writer)?;
    match output {
        Some(output) => {
            let button_id = format!("btn_{id}");
            let panel_id = format!("div_{id}");
            let onclick = format!("toggleOutput('{panel_id}')");
            let button_class = match status {
                CaseStatus::Passed => "btn btn-success",
                CaseStatus::Failed => "btn btn-danger",
                CaseStatus::Errored => "btn btn-warning",
            };
            serialize_text_element(
                "button",
                &[
                    ("id", button_id.as_str()),
                    ("type", "button"),
                    ("class", button_class),
                    ("onclick", onclick.as_str()),
                ],
                status.label(),
                writer,
            )?;
            serialize_start_tag(
                DIV_TAG,
                &[("id", panel_id.as_str()), ("class", "collapse in")],
                writer,
            )?;
            serialize_text_element(PRE_TAG, &[], output.as_str(), writer)?;
            serialize_end_tag(DIV_TAG, writer)?;
        }
        None => {
            serialize_text_element(
                "span",
                &[("class", "label")],
                status.label(),
                writer,
            )?;
        }
    }
    serialize_end_tag(TD_TAG, writer)?;

    if screenshots && output.is_some() {
        serialize_screenshot(screenshot, writer)?;
    } else {
        serialize_text_element(TD_TAG, &[("class", style)], "", writer)?;
    }

    serialize_end_tag(TR_TAG, writer)?;
    Ok(())
}

fn serialize_screenshot(
    screenshot: &Screenshot,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let Screenshot { file, browser } = screenshot;

    serialize_start_tag(TD_TAG, &[("class", "text-center")], writer)?;
    serialize_text(&format!("Browser: {browser}"), writer)?;
    serialize_empty_tag("br", &[], writer)?;
    serialize_empty_tag("br", &[], writer)?;
    let label = format!("Screenshot: {file}");
    if is_linkable(file) {
        serialize_text_element(
            A_TAG,
            &[("href", file.as_str()), ("target", "_blank")],
            &label,
            writer,
        )?;
    } else if !file.is_empty() {
        serialize_text(&label, writer)?;
    }
    serialize_end_tag(TD_TAG, writer)
}

// Screenshot files come from test output, so script and data URLs are shown but never linked.
fn is_linkable(file: &str) -> bool {
    let file = file.trim_start().to_ascii_lowercase();
    !file.is_empty()
        && !["javascript:", "vbscript:", "data:"]
            .iter()
            .any(|scheme| file.starts_with(scheme))
}

fn serialize_start_tag(
    tag_name: &'static str,
    attributes: &[(&str, &str)],
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let tag = start_tag(tag_name, attributes);
    writer.write_event(Event::Start(tag))?;
    Ok(())
}

fn serialize_empty_tag(
    tag_name: &'static str,
    attributes: &[(&str, &str)],
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let tag = start_tag(tag_name, attributes);
    writer.write_event(Event::Empty(tag))?;
    Ok(())
}

fn start_tag(tag_name: &'static str, attributes: &[(&str, &str)]) -> BytesStart<'static> {
    let mut tag = BytesStart::new(tag_name);
    for (key, value) in attributes {
        tag.push_attribute((*key, strip_invalid_chars(value).as_ref()));
    }
    tag
}

fn serialize_end_tag(
    tag_name: &'static str,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    writer.write_event(Event::End(BytesEnd::new(tag_name)))?;
    Ok(())
}

fn serialize_text(text: &str, writer: &mut Writer<impl io::Write>) -> Result<(), SerializeError> {
    if !text.is_empty() {
        writer.write_event(Event::Text(BytesText::new(&strip_invalid_chars(text))))?;
    }
    Ok(())
}

fn serialize_text_element(
    tag_name: &'static str,
    attributes: &[(&str, &str)],
    text: &str,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    serialize_start_tag(tag_name, attributes, writer)?;
    serialize_text(text, writer)?;
    serialize_end_tag(tag_name, writer)
}

// Only used for the fixed stylesheet and script.
fn serialize_raw_element(
    tag_name: &'static str,
    attributes: &[(&str, &str)],
    raw: &'static str,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    serialize_start_tag(tag_name, attributes, writer)?;
    writer.write_event(Event::Text(BytesText::from_escaped(raw)))?;
    serialize_end_tag(tag_name, writer)
}

// Serialize time as seconds with 2 decimal points.
fn serialize_time(time: &Duration) -> String {
    format!("{:.2}s", time.as_secs_f64())
}
