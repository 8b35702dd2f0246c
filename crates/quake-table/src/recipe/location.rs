use super::{Recipe, RecipeCore};
use crate::array::Array;
use crate::error::TableResult;
use crate::header::{Header, SubHeader};
use crate::table::Table;
use quake_geodesy::ne_to_latlon;

/// Latitude/longitude of points given as a reference point plus a local
/// north/east offset.
///
/// Requires the group `c5 = (ref_lat, ref_lon, north_shift, east_shift, depth)`
/// and computes the group `latlon = (lat, lon)`.
#[derive(Debug)]
pub struct LocationRecipe {
    core: RecipeCore,
}

impl LocationRecipe {
    pub fn new() -> Self {
        Self::named("location")
    }

    fn named(name: &str) -> Self {
        let mut core = RecipeCore::new(name);
        core.register_required([Header::grouped_unchecked(
            "c5",
            vec![
                SubHeader::new("ref_lat").with_unit("degrees"),
                SubHeader::new("ref_lon").with_unit("degrees"),
                SubHeader::new("north_shift").with_unit("m"),
                SubHeader::new("east_shift").with_unit("m"),
                SubHeader::new("depth").with_unit("m"),
            ],
        )]);
        core.register_computed(
            Header::grouped_unchecked(
                "latlon",
                vec![
                    SubHeader::new("lat").with_unit("degrees"),
                    SubHeader::new("lon").with_unit("degrees"),
                ],
            ),
            update_latlon,
        );
        Self { core }
    }
}

impl Default for LocationRecipe {
    fn default() -> Self {
        Self::new()
    }
}

impl Recipe for LocationRecipe {
    fn core(&self) -> &RecipeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut RecipeCore {
        &mut self.core
    }
}

fn update_latlon(host: &Table) -> TableResult<Array> {
    let column = |name: &str| host.column(name)?.to_vec::<f64>();
    let (lats, lons) = ne_to_latlon(
        &column("ref_lat")?,
        &column("ref_lon")?,
        &column("north_shift")?,
        &column("east_shift")?,
    )?;

    let mut latlon = Vec::with_capacity(lats.len() * 2);
    for (lat, lon) in lats.into_iter().zip(lons) {
        latlon.push(lat);
        latlon.push(lon);
    }
    Array::from_row_major(latlon, 2)
}

/// Seismic event catalog columns: everything [`LocationRecipe`] needs plus
/// origin `time` (s) and `magnitude`. Computes the same `latlon` group.
#[derive(Debug)]
pub struct EventRecipe {
    location: LocationRecipe,
}

impl EventRecipe {
    pub fn new() -> Self {
        let mut location = LocationRecipe::named("event");
        location.core.register_required([
            Header::new("time").with_unit("s"),
            Header::new("magnitude"),
        ]);
        Self { location }
    }
}

impl Default for EventRecipe {
    fn default() -> Self {
        Self::new()
    }
}

impl Recipe for EventRecipe {
    fn core(&self) -> &RecipeCore {
        self.location.core()
    }

    fn core_mut(&mut self) -> &mut RecipeCore {
        self.location.core_mut()
    }
}
