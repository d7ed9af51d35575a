//! Formatted output helpers for CLI commands.

use std::fmt::Write;

use lonebox_common::types::ContainerInfo;

/// Renders containers as an aligned table with a header row.
#[must_use]
pub fn format_containers(containers: &[ContainerInfo]) -> String {
    let image_width = containers
        .iter()
        .map(|c| c.image.len())
        .chain(std::iter::once("IMAGE".len()))
        .max()
        .unwrap_or_default();

    let mut out = String::new();
    let _ = writeln!(out, "{:<12}{:<image_width$}  STATE", "ID", "IMAGE");
    for c in containers {
        let _ = writeln!(
            out,
            "{:<12}{:<image_width$}  {}",
            c.id.short(),
            c.image,
            c.state
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use lonebox_common::types::ContainerId;

    use super::*;

    fn info(id: &str, image: &str, state: &str) -> ContainerInfo {
        ContainerInfo {
            id: ContainerId::new(id),
            image: image.into(),
            state: state.into(),
            names: Vec::new(),
        }
    }

    #[test]
    fn empty_listing_has_header_only() {
        assert_eq!(format_containers(&[]), "ID          IMAGE  STATE\n");
    }

    #[test]
    fn ids_are_shortened_and_columns_aligned() {
        let table = format_containers(&[
            info("0123456789abcdef", "python:alpine", "running"),
            info("fedcba9876543210", "nginx", "exited"),
        ]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[1], "0123456789  python:alpine  running");
        assert_eq!(lines[2], "fedcba9876  nginx          exited");
    }
}
