use anyhow::Context;
use chrono::{Local, NaiveDate, NaiveTime};
use clap::Parser;
use slot_booking::core::{AppointmentReader, AppointmentWriter, CatalogReader, ConfigProvider};
use slot_booking::utils::error::ErrorSeverity;
use slot_booking::utils::{format, logger};
use slot_booking::{
    BookingError, BookingFlow, CliConfig, Command, MemoryStore, PostgrestStore, Scheduler,
    StoreKind, TomlConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting slot-booking CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 載入並驗證配置
    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    let window = config.slot_window();
    let result = match config.store.kind {
        StoreKind::Memory => {
            tracing::info!("Using in-memory store with the sample catalog");
            let scheduler = Scheduler::new(MemoryStore::with_sample_catalog(), window);
            run(&scheduler, &config, cli.command).await
        }
        StoreKind::Postgrest => {
            let store = PostgrestStore::from_config(&config)
                .context("failed to build the PostgREST client")?;
            let scheduler = Scheduler::new(store, window);
            run(&scheduler, &config, cli.command).await
        }
    };

    if let Err(e) = result {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 2,
            ErrorSeverity::Medium => 3,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 4,
        };
        std::process::exit(exit_code);
    }

    Ok(())
}

async fn run<S>(
    scheduler: &Scheduler<S>,
    config: &TomlConfig,
    command: Command,
) -> slot_booking::Result<()>
where
    S: CatalogReader + AppointmentReader + AppointmentWriter + Clone,
{
    match command {
        Command::Services => {
            let services = scheduler.services().await?;
            if services.is_empty() {
                println!("No services available.");
            }
            for service in services {
                println!(
                    "{:<16} {:<28} {:>7} {:>8}  {}",
                    service.id,
                    service.name,
                    format::duration_label(service.duration),
                    format::price_label(service.price),
                    service.description
                );
            }
        }
        Command::Days => {
            let today = Local::now().date_naive();
            for day in scheduler.selectable_days(today, config.booking_horizon_days()) {
                println!("{}  {}", day, format::day_label(&day));
            }
        }
        Command::Slots { service, date } => {
            let service = scheduler.find_service(&service).await?;
            println!("{} on {}", service.name, date);
            print_availability(scheduler, date).await?;
        }
        Command::Book {
            service,
            date,
            time,
            name,
            email,
        } => book(scheduler, &service, date, time, &name, &email).await?,
        Command::Appointments => {
            let listing = scheduler.operator_listing(Local::now().naive_local()).await?;
            println!("{} Total Bookings", listing.total());
            if listing.is_empty() {
                println!("No bookings found.");
            }
            for entry in &listing.entries {
                let apt = &entry.summary.appointment;
                println!(
                    "{:<20} {:<20} {:<28} {:<24} {:>8}  {}",
                    format::summary_label(&apt.start_time),
                    apt.customer_name,
                    apt.customer_email,
                    entry.summary.service_name,
                    format::price_label(entry.summary.service_price),
                    if entry.is_finished { "Done" } else { "Upcoming" }
                );
            }
        }
    }

    Ok(())
}

async fn print_availability<S>(scheduler: &Scheduler<S>, date: NaiveDate) -> slot_booking::Result<()>
where
    S: CatalogReader + AppointmentReader + AppointmentWriter + Clone,
{
    for entry in scheduler.availability(date).await? {
        let marker = if entry.is_taken { "taken" } else { "free" };
        println!("  {:>8}  {}", format::slot_label(&entry.slot.start), marker);
    }
    Ok(())
}

async fn book<S>(
    scheduler: &Scheduler<S>,
    service_id: &str,
    date: NaiveDate,
    time: NaiveTime,
    name: &str,
    email: &str,
) -> slot_booking::Result<()>
where
    S: CatalogReader + AppointmentReader + AppointmentWriter + Clone,
{
    let mut flow = BookingFlow::new();
    flow.select_service(scheduler.find_service(service_id).await?)?;
    flow.select_date(date, scheduler.availability(date).await?)?;
    flow.select_slot(date.and_time(time))?;
    flow.set_details(name, email)?;

    let request = flow.begin_submit()?;
    let outcome = scheduler.book(&request).await;
    flow.complete(&outcome)?;

    match (&flow, outcome) {
        (
            BookingFlow::Done {
                service,
                slot,
                appointment_id,
                customer_email,
            },
            Ok(_),
        ) => {
            println!("✅ Booking Confirmed!");
            println!("   {} - {}", service.name, format::summary_label(&slot.start));
            println!("   Price: {}", format::price_label(service.price));
            println!("   Reference: {}", appointment_id);
            println!("   We have sent a confirmation email to {}.", customer_email);
            Ok(())
        }
        (BookingFlow::SelectingDate { stale_day: Some(day), .. }, Err(e)) => {
            println!("That slot was just taken. Current availability for {}:", day);
            print_availability(scheduler, *day).await?;
            Err(e)
        }
        (_, Err(e)) => Err(e),
        (state, Ok(id)) => Err(BookingError::InvalidTransition {
            from: state.step_name().to_string(),
            action: format!("confirm appointment {}", id),
        }),
    }
}
