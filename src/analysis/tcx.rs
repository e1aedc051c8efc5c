//! Strict reader for single-activity running TCX files.
//!
//! The reader accepts exactly one shape: one `Running` activity holding one lap
//! with one track, where every trackpoint carries time, position, altitude,
//! distance and heart rate. Anything else is rejected with the node position so
//! the file can be fixed by hand.

use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use log::debug;
use roxmltree::{Document, Node};

use crate::analysis::error::{IngestError, Location};
use crate::types::TraceRecord;

const RUNNING: &str = "Running";
const TRACKPOINT_CHILDREN: usize = 5;

/// Parse a TCX document into retained trace records, in file order.
///
/// Samples whose timestamp has a non-zero millisecond part are dropped.
/// Distances that go backwards are clamped to the last retained distance.
pub fn parse_tcx(input: &[u8]) -> Result<Vec<TraceRecord>, IngestError> {
    parse_tcx_timed(input).map(|(records, _)| records)
}

/// Like [`parse_tcx`], also returning how long building the XML tree took.
pub fn parse_tcx_timed(input: &[u8]) -> Result<(Vec<TraceRecord>, Duration), IngestError> {
    let started = Instant::now();
    let text = std::str::from_utf8(input)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let doc = Document::parse(text)?;
    let xml_time = started.elapsed();
    let records = TcxReader { doc: &doc }.running_trackpoints()?;
    Ok((records, xml_time))
}

struct TcxReader<'a, 'input> {
    doc: &'a Document<'input>,
}

impl<'a, 'input> TcxReader<'a, 'input> {
    fn running_trackpoints(&self) -> Result<Vec<TraceRecord>, IngestError> {
        let database = self.doc.root_element();
        if !has_name(database, "TrainingCenterDatabase") {
            return Err(self.unexpected(database, "TrainingCenterDatabase"));
        }
        let activities = self.only_child(database, "Activities")?;
        let activity = self.only_child(activities, "Activity")?;
        match activity.attribute("Sport") {
            None => return Err(IngestError::MissingSport),
            Some(sport) if sport != RUNNING => {
                return Err(IngestError::UnsupportedSport(sport.to_owned()))
            }
            Some(_) => {}
        }
        let lap = self.single(activity, "Activity", "Lap")?;
        let track = self.single(lap, "Lap", "Track")?;

        let mut records = Vec::new();
        let mut last_distance = 0.0_f64;
        let mut last_timestamp: Option<DateTime<FixedOffset>> = None;
        for (index, node) in significant_children(track).into_iter().enumerate() {
            if !node.is_element() || !has_name(node, "Trackpoint") {
                return Err(self.unexpected(node, "Trackpoint"));
            }
            let children = significant_children(node);
            if children.len() != TRACKPOINT_CHILDREN {
                return Err(IngestError::ChildCount {
                    parent: node_name(node),
                    expected: TRACKPOINT_CHILDREN,
                    actual: children.len(),
                    location: self.location(node),
                });
            }

            let time = self.child_by_name(node, "Time")?;
            let timestamp = self.timestamp(time)?;
            if timestamp.timestamp_subsec_millis() != 0 {
                debug!("ignoring trackpoint #{index}: {timestamp} is not on a second boundary");
                continue;
            }
            if let Some(previous) = last_timestamp {
                if timestamp <= previous {
                    return Err(IngestError::TimestampOrder {
                        previous: previous.to_rfc3339(),
                        current: timestamp.to_rfc3339(),
                        location: self.location(time),
                    });
                }
            }

            let position = self.child_by_name(node, "Position")?;
            let latitude = self.child_at(position, 0, "LatitudeDegrees")?;
            let longitude = self.child_at(position, 1, "LongitudeDegrees")?;
            let altitude = self.child_by_name(node, "AltitudeMeters")?;
            let distance = self.child_by_name(node, "DistanceMeters")?;
            let heart_rate = self.child_by_name(node, "HeartRateBpm")?;
            let heart_rate_value = self.only_child(heart_rate, "Value")?;

            let mut distance_meters = self.real(distance, "DistanceMeters")?;
            if distance_meters < last_distance {
                debug!(
                    "fixing distance on trackpoint #{index}: {distance_meters} m < {last_distance} m"
                );
                distance_meters = last_distance;
            }

            let record = TraceRecord {
                timestamp,
                latitude_degrees: self.real(latitude, "LatitudeDegrees")?,
                longitude_degrees: self.real(longitude, "LongitudeDegrees")?,
                altitude_meters: self.real(altitude, "AltitudeMeters")?,
                distance_meters,
                heart_rate_bpm: self.number(heart_rate_value, "HeartRateBpm")?,
            };
            last_distance = distance_meters;
            last_timestamp = Some(timestamp);
            records.push(record);
        }
        Ok(records)
    }

    fn location(&self, node: Node) -> Location {
        let pos = self.doc.text_pos_at(node.range().start);
        Location {
            line: pos.row,
            column: pos.col,
        }
    }

    fn unexpected(&self, node: Node, expected: &'static str) -> IngestError {
        IngestError::UnexpectedNode {
            expected,
            found: node_name(node),
            location: self.location(node),
        }
    }

    /// The node must have exactly one child, and it must be called `name`.
    fn only_child(
        &self,
        node: Node<'a, 'input>,
        name: &'static str,
    ) -> Result<Node<'a, 'input>, IngestError> {
        let children = significant_children(node);
        if children.len() != 1 {
            return Err(IngestError::ChildCount {
                parent: node_name(node),
                expected: 1,
                actual: children.len(),
                location: self.location(node),
            });
        }
        let child = children[0];
        if !child.is_element() || !has_name(child, name) {
            return Err(self.unexpected(child, name));
        }
        Ok(child)
    }

    fn child_at(
        &self,
        node: Node<'a, 'input>,
        index: usize,
        name: &'static str,
    ) -> Result<Node<'a, 'input>, IngestError> {
        let children = significant_children(node);
        let Some(child) = children.get(index).copied() else {
            return Err(IngestError::ChildCount {
                parent: node_name(node),
                expected: index + 1,
                actual: children.len(),
                location: self.location(node),
            });
        };
        if !child.is_element() || !has_name(child, name) {
            return Err(self.unexpected(child, name));
        }
        Ok(child)
    }

    fn child_by_name(
        &self,
        node: Node<'a, 'input>,
        name: &'static str,
    ) -> Result<Node<'a, 'input>, IngestError> {
        node.children()
            .find(|child| child.is_element() && has_name(*child, name))
            .ok_or_else(|| IngestError::MissingChild {
                parent: node_name(node),
                expected: name,
                location: self.location(node),
            })
    }

    /// Exactly one `child` element, other siblings allowed.
    fn single(
        &self,
        node: Node<'a, 'input>,
        parent: &'static str,
        child: &'static str,
    ) -> Result<Node<'a, 'input>, IngestError> {
        let matches: Vec<Node<'a, 'input>> = node
            .children()
            .filter(|c| c.is_element() && has_name(*c, child))
            .collect();
        match matches.as_slice() {
            [only] => Ok(*only),
            _ => Err(IngestError::NodeCount {
                parent,
                child,
                actual: matches.len(),
                location: self.location(node),
            }),
        }
    }

    fn number<T: std::str::FromStr>(
        &self,
        node: Node,
        field: &'static str,
    ) -> Result<T, IngestError> {
        let text = node.text().unwrap_or_default();
        text.trim()
            .parse::<T>()
            .map_err(|_| IngestError::InvalidNumber {
                field,
                text: text.to_owned(),
                location: self.location(node),
            })
    }

    /// Finite decimal; `NaN` and infinities are rejected like any other bad text.
    fn real(&self, node: Node, field: &'static str) -> Result<f64, IngestError> {
        let value = self.number::<f64>(node, field)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(IngestError::InvalidNumber {
                field,
                text: node.text().unwrap_or_default().to_owned(),
                location: self.location(node),
            })
        }
    }

    fn timestamp(&self, node: Node) -> Result<DateTime<FixedOffset>, IngestError> {
        let text = node.text().unwrap_or_default();
        parse_timestamp(text).ok_or_else(|| IngestError::InvalidTimestamp {
            text: text.to_owned(),
            location: self.location(node),
        })
    }
}

/// ISO-8601 with optional fractional seconds; a missing offset means UTC.
fn parse_timestamp(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return Some(timestamp);
    }
    let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    let utc = FixedOffset::east_opt(0)?;
    Some(utc.from_utc_datetime(&naive))
}

/// Child nodes that matter structurally: elements and non-blank text.
fn significant_children<'a, 'input>(node: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
    node.children()
        .filter(|child| {
            child.is_element()
                || (child.is_text() && !child.text().unwrap_or_default().trim().is_empty())
        })
        .collect()
}

fn has_name(node: Node, name: &str) -> bool {
    node.tag_name().name().eq_ignore_ascii_case(name)
}

fn node_name(node: Node) -> String {
    if node.is_element() {
        node.tag_name().name().to_owned()
    } else {
        "#text".to_owned()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{document_with, running, trackpoint};
    use super::*;

    fn parse(doc: &str) -> Result<Vec<TraceRecord>, IngestError> {
        parse_tcx(doc.as_bytes())
    }

    #[test]
    fn reads_all_fields_in_order() {
        let doc = running(&[
            trackpoint("2024-05-04T08:00:00Z", 0.0, 120),
            trackpoint("2024-05-04T08:00:01Z", 3.2, 121),
        ]);
        let records = parse(&doc).unwrap();
        assert_eq!(records.len(), 2);
        let first = &records[0];
        assert_eq!(first.timestamp.to_rfc3339(), "2024-05-04T08:00:00+00:00");
        assert_eq!(first.latitude_degrees, 48.1371);
        assert_eq!(first.longitude_degrees, 11.5754);
        assert_eq!(first.altitude_meters, 519.4);
        assert_eq!(first.heart_rate_bpm, 120);
        assert_eq!(records[1].distance_meters, 3.2);
        assert_eq!(records[1].timestamp_ms() - first.timestamp_ms(), 1000);
    }

    #[test]
    fn drops_samples_off_the_second_grid() {
        let doc = running(&[
            trackpoint("2024-05-04T08:00:00.000Z", 0.0, 120),
            trackpoint("2024-05-04T08:00:00.500Z", 1.0, 120),
            trackpoint("2024-05-04T08:00:01.000Z", 2.0, 121),
        ]);
        let records = parse(&doc).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].distance_meters, 2.0);
    }

    #[test]
    fn dropped_samples_skip_numeric_validation() {
        let mut odd = trackpoint("2024-05-04T08:00:00.250Z", 0.0, 120);
        odd = odd.replace("<AltitudeMeters>519.4", "<AltitudeMeters>high");
        let doc = running(&[odd, trackpoint("2024-05-04T08:00:01Z", 2.0, 121)]);
        assert_eq!(parse(&doc).unwrap().len(), 1);
    }

    #[test]
    fn backwards_distance_is_clamped_to_last_retained() {
        let doc = running(&[
            trackpoint("2024-05-04T08:00:00Z", 10.0, 120),
            // dropped, must not move the baseline
            trackpoint("2024-05-04T08:00:00.400Z", 50.0, 120),
            trackpoint("2024-05-04T08:00:01Z", 8.0, 121),
            trackpoint("2024-05-04T08:00:02Z", 12.0, 122),
        ]);
        let records = parse(&doc).unwrap();
        let distances: Vec<f64> = records.iter().map(|r| r.distance_meters).collect();
        assert_eq!(distances, vec![10.0, 10.0, 12.0]);
        assert!(records.windows(2).all(|w| w[1].distance_meters >= w[0].distance_meters));
    }

    #[test]
    fn negative_first_distance_is_clamped_to_zero() {
        let doc = running(&[trackpoint("2024-05-04T08:00:00Z", -3.0, 120)]);
        assert_eq!(parse(&doc).unwrap()[0].distance_meters, 0.0);
    }

    #[test]
    fn rejects_other_sports() {
        let doc = document_with("Biking", &[&[trackpoint("2024-05-04T08:00:00Z", 0.0, 120)]]);
        assert!(matches!(parse(&doc), Err(IngestError::UnsupportedSport(s)) if s == "Biking"));
        let missing = running(&[]).replace(" Sport=\"Running\"", "");
        assert!(matches!(parse(&missing), Err(IngestError::MissingSport)));
    }

    #[test]
    fn requires_exactly_one_lap() {
        let point = [trackpoint("2024-05-04T08:00:00Z", 0.0, 120)];
        let doc = document_with("Running", &[&point, &point]);
        assert!(matches!(
            parse(&doc),
            Err(IngestError::NodeCount { child: "Lap", actual: 2, .. })
        ));
        let none = document_with("Running", &[]);
        assert!(matches!(
            parse(&none),
            Err(IngestError::NodeCount { child: "Lap", actual: 0, .. })
        ));
    }

    #[test]
    fn requires_exactly_one_track() {
        let doc = running(&[]).replace("<Track></Track>", "<Track></Track><Track></Track>");
        assert!(matches!(
            parse(&doc),
            Err(IngestError::NodeCount { child: "Track", actual: 2, .. })
        ));
    }

    #[test]
    fn lap_without_track_is_rejected() {
        let doc = running(&[]).replace("<Track></Track>", "");
        assert!(matches!(
            parse(&doc),
            Err(IngestError::NodeCount { child: "Track", actual: 0, .. })
        ));
    }

    #[test]
    fn empty_activities_is_rejected() {
        let doc = running(&[]);
        let start = doc.find("<Activities>").unwrap();
        let end = doc.find("</Activities>").unwrap() + "</Activities>".len();
        let empty = format!("{}<Activities/>{}", &doc[..start], &doc[end..]);
        assert!(matches!(
            parse(&empty),
            Err(IngestError::ChildCount { expected: 1, actual: 0, .. })
        ));
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        for text in ["NaN", "inf", "-infinity"] {
            let point = trackpoint("2024-05-04T08:00:01Z", 0.0, 120).replace(
                "<DistanceMeters>0</DistanceMeters>",
                &format!("<DistanceMeters>{text}</DistanceMeters>"),
            );
            let doc = running(&[
                trackpoint("2024-05-04T08:00:00Z", 10.0, 120),
                point,
                trackpoint("2024-05-04T08:00:02Z", 5.0, 120),
            ]);
            match parse(&doc) {
                Err(IngestError::InvalidNumber { field, text: found, .. }) => {
                    assert_eq!(field, "DistanceMeters");
                    assert_eq!(found, text);
                }
                other => panic!("expected invalid number for {text}, got {other:?}"),
            }
        }
        let altitude = trackpoint("2024-05-04T08:00:00Z", 0.0, 120).replace(
            "<AltitudeMeters>519.4</AltitudeMeters>",
            "<AltitudeMeters>nan</AltitudeMeters>",
        );
        assert!(matches!(
            parse(&running(&[altitude])),
            Err(IngestError::InvalidNumber { field: "AltitudeMeters", .. })
        ));
    }

    #[test]
    fn requires_a_single_activity() {
        let doc = running(&[]).replace("</Activity>", "</Activity><Activity Sport=\"Running\"/>");
        assert!(matches!(
            parse(&doc),
            Err(IngestError::ChildCount { expected: 1, actual: 2, .. })
        ));
    }

    #[test]
    fn trackpoint_needs_five_children() {
        let point = trackpoint("2024-05-04T08:00:00Z", 0.0, 120)
            .replace("<HeartRateBpm><Value>120</Value></HeartRateBpm>", "");
        let err = parse(&running(&[point])).unwrap_err();
        match err {
            IngestError::ChildCount {
                parent,
                expected,
                actual,
                location,
            } => {
                assert_eq!(parent, "Trackpoint");
                assert_eq!((expected, actual), (5, 4));
                assert!(location.line > 1);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn latitude_must_precede_longitude() {
        let point = trackpoint("2024-05-04T08:00:00Z", 0.0, 120).replace(
            "<LatitudeDegrees>48.1371</LatitudeDegrees><LongitudeDegrees>11.5754</LongitudeDegrees>",
            "<LongitudeDegrees>11.5754</LongitudeDegrees><LatitudeDegrees>48.1371</LatitudeDegrees>",
        );
        assert!(matches!(
            parse(&running(&[point])),
            Err(IngestError::UnexpectedNode { expected: "LatitudeDegrees", .. })
        ));
    }

    #[test]
    fn wrong_child_names_are_rejected() {
        let point = trackpoint("2024-05-04T08:00:00Z", 0.0, 120)
            .replace("AltitudeMeters", "ElevationMeters");
        assert!(matches!(
            parse(&running(&[point])),
            Err(IngestError::MissingChild { expected: "AltitudeMeters", .. })
        ));
        let point = trackpoint("2024-05-04T08:00:00Z", 0.0, 120)
            .replace("<Value>120</Value>", "<Bpm>120</Bpm>");
        assert!(matches!(
            parse(&running(&[point])),
            Err(IngestError::UnexpectedNode { expected: "Value", .. })
        ));
    }

    #[test]
    fn unparsable_text_is_structural() {
        let point = trackpoint("2024-05-04T08:00:00Z", 0.0, 120).replace(">120<", ">12o<");
        assert!(matches!(
            parse(&running(&[point])),
            Err(IngestError::InvalidNumber { field: "HeartRateBpm", .. })
        ));
        let point = trackpoint("yesterday", 0.0, 120);
        assert!(matches!(
            parse(&running(&[point])),
            Err(IngestError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn repeated_timestamps_are_rejected() {
        let doc = running(&[
            trackpoint("2024-05-04T08:00:00Z", 0.0, 120),
            trackpoint("2024-05-04T08:00:00Z", 1.0, 120),
        ]);
        assert!(matches!(parse(&doc), Err(IngestError::TimestampOrder { .. })));
    }

    #[test]
    fn broken_xml_and_foreign_roots_fail() {
        assert!(matches!(parse("<TrainingCenterDatabase>"), Err(IngestError::Xml(_))));
        assert!(matches!(
            parse("<gpx><trk/></gpx>"),
            Err(IngestError::UnexpectedNode { expected: "TrainingCenterDatabase", .. })
        ));
        assert!(matches!(
            parse_tcx(&[0xff, 0xfe, 0x00]),
            Err(IngestError::Encoding(_))
        ));
    }

    #[test]
    fn accepts_local_offsets_and_naive_times() {
        let doc = running(&[
            trackpoint("2024-05-04T10:00:00+02:00", 0.0, 120),
            trackpoint("2024-05-04T08:00:01", 3.0, 120),
        ]);
        let records = parse(&doc).unwrap();
        assert_eq!(records[1].timestamp_ms() - records[0].timestamp_ms(), 1000);
    }
}
