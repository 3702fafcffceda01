//! Driver and device helpers built on top of the editor.
//!
//! These answer the questions a driver installer asks about an xorg.conf:
//! which Device sections are actually used by the active layout, and which
//! driver they load.

use crate::config::XorgConfig;
use crate::editor::AddOptions;
use crate::error::XorgResult;
use crate::types::{OptionValue, SectionKind, eq_ignore_case};
use std::collections::BTreeMap;
use tracing::debug;

impl XorgConfig {
    /// Create an empty section for every broken reference
    ///
    /// Returns the number of sections created.
    pub fn fix_broken_references(&mut self) -> XorgResult<usize> {
        let broken = self.get_broken_references()?;
        let mut created = 0;

        for (kind, identifiers) in broken {
            for identifier in identifiers {
                self.make_section(kind, Some(&identifier))?;
                created += 1;
            }
        }

        debug!(created, "broken references fixed");
        Ok(created)
    }

    /// The `Driver` of a section
    pub fn get_driver(&self, kind: SectionKind, position: usize) -> XorgResult<OptionValue> {
        self.get_value(kind, "Driver", position)
    }

    /// Set the `Driver` of one or every section of a kind
    pub fn set_driver(&mut self, kind: SectionKind, driver: &str, position: Option<usize>) -> XorgResult<()> {
        let opts = AddOptions {
            position,
            ..AddOptions::new()
        };
        self.add_option(kind, "Driver", driver, opts)
    }

    /// Whether any of the given Device sections (all by default) loads `driver`
    pub fn is_driver_in_sections(&self, driver: &str, positions: Option<&[usize]>) -> bool {
        let positions = match positions {
            Some(positions) => positions.to_vec(),
            None => self.document.positions(SectionKind::Device),
        };

        positions.into_iter().any(|position| {
            self.get_driver(SectionKind::Device, position)
                .is_ok_and(|value| value.as_str().is_some_and(|d| eq_ignore_case(d, driver.trim())))
        })
    }

    /// Device positions used by the Screens of a ServerLayout
    ///
    /// References that do not resolve are skipped.
    pub fn get_devices_from_server_layout(&self, position: usize) -> XorgResult<Vec<usize>> {
        let screens = self.get_references(SectionKind::ServerLayout, position, Some(&[SectionKind::Screen][..]))?;
        let mut devices = Vec::new();

        for screen in screens.get(&SectionKind::Screen).into_iter().flatten() {
            let Ok(screen_position) = self.get_position(SectionKind::Screen, screen) else {
                continue;
            };
            let references = self.get_references(SectionKind::Screen, screen_position, Some(&[SectionKind::Device][..]))?;
            for device in references.get(&SectionKind::Device).into_iter().flatten() {
                if let Ok(device_position) = self.get_position(SectionKind::Device, device) {
                    if !devices.contains(&device_position) {
                        devices.push(device_position);
                    }
                }
            }
        }

        Ok(devices)
    }

    /// Device positions the X server will actually use
    ///
    /// With several ServerLayouts the default one decides; without a usable
    /// default every layout counts. Without any layout every Device does.
    pub fn get_devices_in_use(&self) -> XorgResult<Vec<usize>> {
        let layouts = self.document.positions(SectionKind::ServerLayout);
        if layouts.is_empty() {
            return Ok(self.document.positions(SectionKind::Device));
        }

        let selected = if layouts.len() > 1 {
            let default = self.get_default_server_layout()?;
            if default.len() == 1 { default } else { layouts }
        } else {
            layouts
        };

        let mut devices = Vec::new();
        for layout in selected {
            for device in self.get_devices_from_server_layout(layout)? {
                if !devices.contains(&device) {
                    devices.push(device);
                }
            }
        }

        Ok(devices)
    }

    /// Whether a Device section in use loads `driver`
    pub fn is_driver_enabled(&self, driver: &str) -> XorgResult<bool> {
        let devices = self.get_devices_in_use()?;
        Ok(self.is_driver_in_sections(driver, Some(&devices)))
    }

    /// Map of Device position to the position of the Screen using it
    pub fn get_screen_device_relationships(&self) -> XorgResult<BTreeMap<usize, usize>> {
        let mut relationships = BTreeMap::new();

        for screen in self.document.positions(SectionKind::Screen) {
            let references = self.get_references(SectionKind::Screen, screen, Some(&[SectionKind::Device][..]))?;
            for device in references.get(&SectionKind::Device).into_iter().flatten() {
                if let Ok(device_position) = self.get_position(SectionKind::Device, device) {
                    relationships.insert(device_position, screen);
                }
            }
        }

        Ok(relationships)
    }
}
