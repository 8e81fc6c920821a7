use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::cli::{ParcelQueryArgs, ParcelTargetArgs};
use crate::commands::{emit, open_scraper};
use crate::model::LandPlotIdentifiers;
use crate::scraper_api::{LandPlotQuery, ParcelDirectory, ProviderError};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ParcelQuery {
    Address(String),
    Parcel { gush: String, helka: String },
    LandPlot {
        coordinates: Option<(f64, f64)>,
        land_plot_id: Option<String>,
    },
}

impl ParcelQuery {
    /// Address wins over gush/helka, which win over coordinates and plot ids.
    pub(crate) fn from_target(target: &ParcelTargetArgs) -> Result<Self> {
        let address = trimmed(target.address.as_deref());
        let gush = trimmed(target.gush.as_deref());
        let helka = trimmed(target.helka.as_deref());
        let land_plot_id = trimmed(target.land_plot_id.as_deref());

        if gush.is_some() != helka.is_some() {
            bail!("--gush and --helka must be given together");
        }
        let coordinates = match (target.coordinate_x, target.coordinate_y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((x, y)),
            (Some(_), Some(_)) => bail!("--coordinate-x and --coordinate-y must be finite numbers"),
            (None, None) => None,
            _ => bail!("--coordinate-x and --coordinate-y must be given together"),
        };

        if let Some(address) = address {
            return Ok(Self::Address(address));
        }
        if let (Some(gush), Some(helka)) = (gush, helka) {
            return Ok(Self::Parcel { gush, helka });
        }
        if coordinates.is_none() && land_plot_id.is_none() {
            bail!("one of --address, --gush/--helka, --coordinate-x/--coordinate-y or --land-plot-id is required");
        }
        Ok(Self::LandPlot {
            coordinates,
            land_plot_id,
        })
    }

    fn unresolved(&self) -> LandPlotIdentifiers {
        match self {
            Self::Address(address) => LandPlotIdentifiers {
                addresses: vec![address.clone()],
                ..LandPlotIdentifiers::default()
            },
            Self::Parcel { gush, helka } => LandPlotIdentifiers {
                gush: gush.clone(),
                helka: helka.clone(),
                addresses: Vec::new(),
            },
            Self::LandPlot { .. } => LandPlotIdentifiers::default(),
        }
    }
}

pub async fn run(args: ParcelQueryArgs) -> Result<()> {
    let query = ParcelQuery::from_target(&args.target)?;
    let scraper = open_scraper(&args.scraper, args.timeout.request_timeout())?;
    let directory = scraper.as_ref().map(|api| api as &dyn ParcelDirectory);

    let identifiers = resolve_parcel(directory, &query).await?;
    info!(
        gush = %identifiers.gush,
        helka = %identifiers.helka,
        addresses = identifiers.addresses.len(),
        "land plot resolved"
    );
    emit(&identifiers, args.output.as_deref())
}

/// Without a directory the query's own identifiers come back unresolved.
pub(crate) async fn resolve_parcel(
    directory: Option<&dyn ParcelDirectory>,
    query: &ParcelQuery,
) -> Result<LandPlotIdentifiers, ProviderError> {
    let Some(directory) = directory else {
        return Ok(query.unresolved());
    };

    match query {
        ParcelQuery::Address(address) => match directory.parcel_from_address(address).await {
            Ok(identifiers) => Ok(identifiers),
            Err(err) => {
                warn!(address = %address, error = %err, "address lookup failed, retrying as a land plot id");
                directory
                    .land_plot_identifiers(&LandPlotQuery {
                        land_plot_id: Some(address.as_str()),
                        ..LandPlotQuery::default()
                    })
                    .await
            }
        },
        ParcelQuery::Parcel { gush, helka } => match directory.address_from_parcel(gush, helka).await {
            Ok(identifiers) => Ok(identifiers),
            Err(err) => {
                warn!(gush = %gush, helka = %helka, error = %err, "parcel address lookup failed, retrying as a land plot id");
                let land_plot_id = format!("{gush}/{helka}");
                let mut identifiers = directory
                    .land_plot_identifiers(&LandPlotQuery {
                        land_plot_id: Some(land_plot_id.as_str()),
                        ..LandPlotQuery::default()
                    })
                    .await?;
                if identifiers.gush.is_empty() {
                    identifiers.gush = gush.clone();
                }
                if identifiers.helka.is_empty() {
                    identifiers.helka = helka.clone();
                }
                Ok(identifiers)
            }
        },
        ParcelQuery::LandPlot {
            coordinates,
            land_plot_id,
        } => {
            directory
                .land_plot_identifiers(&LandPlotQuery {
                    coordinate_x: coordinates.map(|(x, _)| x),
                    coordinate_y: coordinates.map(|(_, y)| y),
                    land_plot_id: land_plot_id.as_deref(),
                })
                .await
        }
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
