// Navigation sections: waypoints and routes
//
// Waypoint ids never appear in the document. On parse each waypoint
// keeps the id (and origin tag) of the previous snapshot entry with the
// same name; new names get the lowest unused id. Routes reference
// waypoints by name and are re-resolved against the freshly parsed
// waypoint list.

use super::{take, Config, Module, RangeId, Result};
use crate::codec::route::{self, Route};
use crate::codec::waypoint::{self, Coordinate, Waypoint, EMPTY_ID, MAX_ID};
use crate::device::{BatchReader, BatchWriter};
use crate::doc::{DocError, Node};
use crate::memmap::DeviceMemoryMap;
use std::collections::HashMap;
use tracing::warn;

const WAYPOINTS: &str = "waypoints";
const ROUTES: &str = "routes";

pub(super) fn register(module: Module, map: &DeviceMemoryMap, reader: &mut BatchReader) {
    match module {
        Module::Waypoints => reader.request(WAYPOINTS, map.waypoints.addr, map.waypoints.len()),
        Module::Routes => reader.request(ROUTES, map.routes.addr, map.routes.len()),
        _ => unreachable!("not a nav module"),
    }
}

pub(super) fn decode(
    module: Module,
    map: &DeviceMemoryMap,
    ranges: &HashMap<RangeId, Vec<u8>>,
    config: &mut Config,
) -> Result<()> {
    match module {
        Module::Waypoints => {
            let bytes = take(ranges, WAYPOINTS)?;
            let region = map.waypoints;
            config.waypoints.clear();
            for slot in 0..region.count {
                let record = &bytes[slot * region.size..(slot + 1) * region.size];
                if let Some(wp) = waypoint::decode(record, Some(region.slot(slot)))? {
                    config.waypoints.push(wp);
                }
            }
        }
        Module::Routes => {
            let bytes = take(ranges, ROUTES)?;
            let region = map.routes;
            config.routes.clear();
            for slot in 0..region.count {
                let record = &bytes[slot * region.size..(slot + 1) * region.size];
                if let Some(rt) = route::decode(record, map.route_capacity)? {
                    config.routes.push(rt);
                }
            }
        }
        _ => unreachable!("not a nav module"),
    }
    Ok(())
}

pub(super) fn emit(module: Module, config: &Config) -> Node {
    match module {
        Module::Waypoints => Node::sequence(
            config
                .waypoints
                .iter()
                .map(|wp| {
                    Node::mapping(vec![
                        ("name", Node::str(&wp.name)),
                        ("lat", Node::str(wp.lat.to_string())),
                        ("lon", Node::str(wp.lon.to_string())),
                    ])
                })
                .collect(),
        ),
        Module::Routes => Node::sequence(
            config
                .routes
                .iter()
                .map(|rt| {
                    let points = rt
                        .points
                        .iter()
                        .filter_map(|&id| {
                            let found = config.waypoints.iter().find(|wp| wp.id == id);
                            if found.is_none() {
                                warn!(route = %rt.name, id, "route leg has no waypoint");
                            }
                            found.map(|wp| Node::str(&wp.name))
                        })
                        .collect();
                    Node::mapping(vec![
                        ("name", Node::str(&rt.name)),
                        ("points", Node::sequence(points).with_flow()),
                    ])
                })
                .collect(),
        ),
        _ => unreachable!("not a nav module"),
    }
}

pub(super) fn parse(
    module: Module,
    map: &DeviceMemoryMap,
    node: &Node,
    previous: &Config,
    draft: &mut Config,
) -> std::result::Result<(), DocError> {
    match module {
        Module::Waypoints => parse_waypoints(map, node, previous, draft),
        Module::Routes => parse_routes(map, node, draft),
        _ => unreachable!("not a nav module"),
    }
}

fn parse_coordinate(item: &Node, key: &str) -> std::result::Result<Coordinate, DocError> {
    let field = item
        .get(key)
        .ok_or_else(|| DocError::invalid(format!("waypoint needs {}", key), item.span()))?;
    Coordinate::parse(field.as_str()?)
        .map_err(|err| DocError::invalid(err.to_string(), field.span()))
}

fn parse_waypoints(
    map: &DeviceMemoryMap,
    node: &Node,
    previous: &Config,
    draft: &mut Config,
) -> std::result::Result<(), DocError> {
    let items = node.as_sequence()?;
    if items.len() > map.waypoints.count {
        return Err(DocError::invalid(
            format!(
                "{} waypoints exceed the device capacity of {}",
                items.len(),
                map.waypoints.count
            ),
            node.span(),
        ));
    }

    let mut waypoints: Vec<Waypoint> = Vec::with_capacity(items.len());
    for item in items {
        let name_node = item
            .get("name")
            .ok_or_else(|| DocError::invalid("waypoint needs a name", item.span()))?;
        let name = name_node.as_str()?.to_string();
        if name.is_empty() || name.len() > waypoint::NAME_LEN {
            return Err(DocError::invalid(
                format!("waypoint name {:?} must be 1 to {} characters", name, waypoint::NAME_LEN),
                name_node.span(),
            ));
        }
        if waypoints.iter().any(|wp| wp.name == name) {
            return Err(DocError::Duplicate {
                what: "waypoint name",
                value: name,
                span: name_node.span(),
            });
        }

        let lat = parse_coordinate(item, "lat")?;
        let lon = parse_coordinate(item, "lon")?;
        let kept = previous.waypoints.iter().find(|wp| wp.name == name);
        waypoints.push(Waypoint {
            // EMPTY_ID marks entries that still need an id
            id: kept.map(|wp| wp.id).unwrap_or(EMPTY_ID),
            name,
            lat,
            lon,
            origin: kept.and_then(|wp| wp.origin),
            address: None,
        });
    }

    // New names take the lowest id not already held by a kept waypoint
    let mut next = 1u8;
    for index in 0..waypoints.len() {
        if waypoints[index].id != EMPTY_ID {
            continue;
        }
        while next <= MAX_ID && waypoints.iter().any(|wp| wp.id == next) {
            next += 1;
        }
        if next > MAX_ID {
            return Err(DocError::invalid("waypoint id space exhausted", node.span()));
        }
        waypoints[index].id = next;
    }

    draft.waypoints = waypoints;
    Ok(())
}

fn parse_routes(
    map: &DeviceMemoryMap,
    node: &Node,
    draft: &mut Config,
) -> std::result::Result<(), DocError> {
    let items = node.as_sequence()?;
    if items.len() > map.routes.count {
        return Err(DocError::invalid(
            format!(
                "{} routes exceed the device capacity of {}",
                items.len(),
                map.routes.count
            ),
            node.span(),
        ));
    }

    let mut routes: Vec<Route> = Vec::with_capacity(items.len());
    for item in items {
        let name_node = item
            .get("name")
            .ok_or_else(|| DocError::invalid("route needs a name", item.span()))?;
        let name = name_node.as_str()?.to_string();
        if name.is_empty() || name.len() > route::NAME_LEN {
            return Err(DocError::invalid(
                format!("route name {:?} must be 1 to {} characters", name, route::NAME_LEN),
                name_node.span(),
            ));
        }

        let points_node = item
            .get("points")
            .ok_or_else(|| DocError::invalid("route needs points", item.span()))?;
        let mut points = Vec::new();
        for point in points_node.as_sequence()? {
            let point_name = point.as_str()?;
            match draft.waypoints.iter().find(|wp| wp.name == point_name) {
                Some(wp) => points.push(wp.id),
                // Unknown reference: drop the leg, keep the route
                None => warn!(route = %name, point = point_name, "skipping unknown waypoint"),
            }
        }
        if points.len() > map.route_capacity {
            return Err(DocError::invalid(
                format!(
                    "route {:?} has {} legs, the device holds {}",
                    name,
                    points.len(),
                    map.route_capacity
                ),
                points_node.span(),
            ));
        }
        routes.push(Route { name, points });
    }

    draft.routes = routes;
    Ok(())
}

pub(super) fn queue(
    module: Module,
    map: &DeviceMemoryMap,
    draft: &Config,
    writer: &mut BatchWriter,
) -> Result<()> {
    match module {
        Module::Waypoints => {
            let region = map.waypoints;
            let mut bytes = Vec::with_capacity(region.len());
            for wp in &draft.waypoints {
                bytes.extend_from_slice(&waypoint::encode(wp)?);
            }
            bytes.resize(region.len(), 0xFF);
            writer.request(WAYPOINTS, region.addr, bytes);
        }
        Module::Routes => {
            let region = map.routes;
            let mut bytes = Vec::with_capacity(region.len());
            for rt in &draft.routes {
                bytes.extend_from_slice(&route::encode(rt, region.size, map.route_capacity)?);
            }
            bytes.resize(region.len(), 0xFF);
            writer.request(ROUTES, region.addr, bytes);
        }
        _ => unreachable!("not a nav module"),
    }
    Ok(())
}
