// Copyright (c) The runrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read Robot Framework `output.xml`.

use crate::RawOutcome;
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use std::{io, mem};

pub(crate) fn read_robot_xml(reader: impl io::BufRead) -> quick_xml::Result<Vec<RawOutcome>> {
    let mut reader = Reader::from_reader(reader);
    reader.trim_text(true);

    let mut state = ReadState::default();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) => state.start(&start)?,
            Event::Empty(start) => {
                // Self-closing elements like <status status="PASS"/> have no matching End event.
                state.start(&start)?;
                state.end();
            }
            Event::Text(text) => state.text(&text.unescape()?),
            Event::CData(cdata) => state.text(&String::from_utf8_lossy(&cdata)),
            Event::End(_) => state.end(),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(state.outcomes)
}

/// The elements the reader cares about, classified by their position in the tree.
///
/// Keywords nested within a test carry their own `<status>` and `<tag>` elements. Only the
/// direct children of `<test>` describe the test itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Element {
    Suite,
    Test,
    TestStatus,
    TestTags,
    TestTag,
    Other,
}

#[derive(Debug, Default)]
struct ReadState {
    stack: Vec<Element>,
    suite_names: Vec<String>,
    current: Option<RawOutcome>,
    tag_buf: String,
    outcomes: Vec<RawOutcome>,
}

impl ReadState {
    fn start(&mut self, start: &BytesStart<'_>) -> quick_xml::Result<()> {
        let parent = self.stack.last().copied();
        let element = match (start.name().as_ref(), parent) {
            (b"suite", _) if self.current.is_none() => {
                self.suite_names
                    .push(attribute(start, "name")?.unwrap_or_default());
                Element::Suite
            }
            (b"test", _) if self.current.is_none() => {
                let case_id = (self.outcomes.len() + 1) as u32;
                let name = attribute(start, "name")?.unwrap_or_default();
                let mut outcome = RawOutcome::new(case_id, name, "");
                outcome.set_suite_path(self.suite_names.iter().cloned());
                self.current = Some(outcome);
                Element::Test
            }
            (b"status", Some(Element::Test)) => {
                let status = attribute(start, "status")?.unwrap_or_default();
                if let Some(outcome) = &mut self.current {
                    outcome.status = status;
                }
                Element::TestStatus
            }
            (b"tags", Some(Element::Test)) => Element::TestTags,
            (b"tag", Some(Element::Test | Element::TestTags)) => {
                self.tag_buf.clear();
                Element::TestTag
            }
            _ => Element::Other,
        };

        self.stack.push(element);
        Ok(())
    }

    fn text(&mut self, text: &str) {
        match self.stack.last() {
            Some(Element::TestStatus) => {
                if let Some(outcome) = &mut self.current {
                    outcome.message.push_str(text);
                }
            }
            Some(Element::TestTag) => self.tag_buf.push_str(text),
            _ => {}
        }
    }

    fn end(&mut self) {
        match self.stack.pop() {
            Some(Element::Suite) => {
                self.suite_names.pop();
            }
            Some(Element::Test) => {
                if let Some(outcome) = self.current.take() {
                    self.outcomes.push(outcome);
                }
            }
            Some(Element::TestTag) => {
                let tag = mem::take(&mut self.tag_buf);
                if !tag.is_empty()
                    && let Some(outcome) = &mut self.current
                {
                    outcome.tags.push(tag);
                }
            }
            _ => {}
        }
    }
}

fn attribute(start: &BytesStart<'_>, name: &str) -> quick_xml::Result<Option<String>> {
    match start.try_get_attribute(name)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}
