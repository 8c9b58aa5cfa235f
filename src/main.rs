use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use flight_booking::config::AppConfig;
use flight_booking::locations;
use flight_booking::models::{Passenger, PassengerField};
use flight_booking::offer_client::{FlightOfferClient, SearchQuery};
use flight_booking::offers::{sort_offers, CurrencyConverter, OfferSummary, SortKey, SortOrder};
use flight_booking::payment::PaymentDetails;
use flight_booking::store::{BookingStore, FallbackBookingStore};
use flight_booking::telemetry::init_tracing;
use flight_booking::wizard::BookingWizard;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "flight-booking", about = "Search, book and manage flights", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Search one-way offers
    Search(SearchArgs),
    /// Search, pick an offer and pay for it
    Book(BookArgs),
    /// List common cities, optionally filtered by name or code
    Cities { filter: Option<String> },
    /// Show a user's bookings
    History { user_id: String },
    /// Delete one of a user's bookings
    Delete { user_id: String, booking_id: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SortArg {
    Price,
    Seats,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Price => SortKey::Price,
            SortArg::Seats => SortKey::Seats,
        }
    }
}

#[derive(Debug, Args)]
struct SearchArgs {
    /// Origin city or airport code, e.g. DEL
    origin: String,
    /// Destination city or airport code, e.g. BOM
    destination: String,
    /// Departure date (YYYY-MM-DD)
    date: NaiveDate,
    #[arg(long, default_value_t = 1)]
    passengers: u32,
    #[arg(long, value_enum, default_value_t = SortArg::Price)]
    sort: SortArg,
    #[arg(long)]
    desc: bool,
}

#[derive(Debug, Args)]
struct BookArgs {
    user_id: String,
    origin: String,
    destination: String,
    date: NaiveDate,
    /// Offer id from the search results
    #[arg(long)]
    offer: String,
    /// first:last:date-of-birth:passport:email:phone, once per passenger
    #[arg(long = "passenger", required = true)]
    passengers: Vec<String>,
    #[arg(long, conflicts_with_all = ["card_number", "card_holder", "card_expiry", "card_cvv"])]
    upi: Option<String>,
    #[arg(long)]
    card_number: Option<String>,
    #[arg(long)]
    card_holder: Option<String>,
    #[arg(long)]
    card_expiry: Option<String>,
    #[arg(long)]
    card_cvv: Option<String>,
}

impl BookArgs {
    fn payment(&self) -> PaymentDetails {
        match &self.upi {
            Some(upi_id) => PaymentDetails::Upi {
                upi_id: upi_id.clone(),
            },
            None => PaymentDetails::Card {
                number: self.card_number.clone().unwrap_or_default(),
                holder_name: self.card_holder.clone().unwrap_or_default(),
                expiry: self.card_expiry.clone().unwrap_or_default(),
                cvv: self.card_cvv.clone().unwrap_or_default(),
            },
        }
    }
}

fn parse_passenger(raw: &str) -> Result<Passenger> {
    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() != PassengerField::ALL.len() {
        bail!(
            "passenger '{}' needs {} ':'-separated fields",
            raw,
            PassengerField::ALL.len()
        );
    }
    let mut passenger = Passenger::default();
    for (field, value) in PassengerField::ALL.into_iter().zip(parts) {
        passenger.set_field(field, value);
    }
    Ok(passenger)
}

fn print_offers(summaries: &[OfferSummary]) {
    for summary in summaries {
        println!(
            "{:<4} {} {:<5} {}  {} - {}  {:<8} stops: {}  {:>12}  {}",
            summary.offer_id,
            summary.carrier,
            summary.flight_number,
            summary.route,
            summary.departure_time,
            summary.arrival_time,
            summary.duration,
            summary.stops,
            summary.price,
            summary.seats
        );
    }
}

async fn search(config: &AppConfig, args: SearchArgs) -> Result<()> {
    let client = FlightOfferClient::from_config(config.provider.clone())?
        .with_display_currency(&config.booking.display_currency);
    let query = SearchQuery::new(&args.origin, &args.destination, args.date, args.passengers);
    let offers = client.search(&query).await?;

    let converter = CurrencyConverter::from_config(&config.booking);
    let order = if args.desc {
        SortOrder::Descending
    } else {
        SortOrder::Ascending
    };
    let sorted = sort_offers(&offers, args.sort.into(), order, &converter);
    let summaries: Vec<OfferSummary> = sorted
        .iter()
        .map(|offer| OfferSummary::from_offer(offer, &converter))
        .collect();

    println!("{} flights found {}", summaries.len(), order.arrow());
    print_offers(&summaries);
    Ok(())
}

async fn book(config: &AppConfig, args: BookArgs) -> Result<()> {
    let passengers = args
        .passengers
        .iter()
        .map(|raw| parse_passenger(raw))
        .collect::<Result<Vec<_>>>()?;

    let client = FlightOfferClient::from_config(config.provider.clone())?
        .with_display_currency(&config.booking.display_currency);
    let store = FallbackBookingStore::from_config(&config.store)?;
    let mut wizard = BookingWizard::new(Some(args.user_id.clone()), &config.booking);

    let query = SearchQuery::new(
        &args.origin,
        &args.destination,
        args.date,
        passengers.len() as u32,
    );
    wizard.search(&client, &query).await?;
    wizard.select_offer(&args.offer)?;
    wizard.enter_passenger_details()?;
    wizard.set_passenger_count(passengers.len())?;
    for (index, passenger) in passengers.iter().enumerate() {
        for field in PassengerField::ALL {
            wizard.update_passenger(index, field, passenger.field(field))?;
        }
    }
    wizard.submit_passengers()?;

    if let Some(total) = wizard.total_price() {
        info!(total = %total, "submitting payment");
    }
    wizard.submit_payment(&args.payment(), &store).await?;

    if let Some((_, ticket)) = wizard.confirmation() {
        print!("{}", ticket.render());
    }
    Ok(())
}

async fn history(config: &AppConfig, user_id: &str) -> Result<()> {
    let store = FallbackBookingStore::from_config(&config.store)?;
    let bookings = store
        .list(user_id)
        .await
        .with_context(|| format!("failed to list bookings for {}", user_id))?;

    if bookings.is_empty() {
        println!("no bookings found for {}", user_id);
        return Ok(());
    }

    let converter = CurrencyConverter::from_config(&config.booking);
    for booking in bookings {
        let summary = OfferSummary::from_offer(&booking.flight, &converter);
        println!(
            "{}  {}  {} {}  {}  passengers: {}  {}",
            booking.booking_id,
            booking.status,
            summary.carrier,
            summary.flight_number,
            summary.route,
            booking.passengers.len(),
            flight_booking::offers::format_money(&booking.total_amount)
        );
    }
    Ok(())
}

async fn delete(config: &AppConfig, user_id: &str, booking_id: &str) -> Result<()> {
    let store = FallbackBookingStore::from_config(&config.store)?;
    let removed = store
        .delete(user_id, booking_id)
        .await
        .with_context(|| format!("failed to delete booking {}", booking_id))?;

    if removed {
        println!("deleted booking {}", booking_id);
    } else {
        println!("booking {} not found", booking_id);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    match cli.command {
        Commands::Search(args) => search(&config, args).await,
        Commands::Book(args) => book(&config, args).await,
        Commands::Cities { filter } => {
            for city in locations::filter(filter.as_deref().unwrap_or("")) {
                println!("{:<4} {} ({})", city.code, city.name, city.country);
            }
            Ok(())
        }
        Commands::History { user_id } => history(&config, &user_id).await,
        Commands::Delete {
            user_id,
            booking_id,
        } => delete(&config, &user_id, &booking_id).await,
    }
}
