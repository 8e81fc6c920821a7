use anyhow::Result;
use tracing::info;

use crate::cli::DiscoverArgs;
use crate::commands::{emit, open_session};
use crate::util::required_identifier;

pub async fn run(args: DiscoverArgs) -> Result<()> {
    let gush = required_identifier("gush", &args.parcel.gush)?;
    let helka = required_identifier("helka", &args.parcel.helka)?;
    let session = open_session(&args.tabanow, &args.events)?;

    let plans = session.client.find_plans_by_parcel(&gush, &helka).await;
    info!(gush = %gush, helka = %helka, plans = plans.len(), "discover finished");

    emit(&plans, args.output.as_deref())
}
