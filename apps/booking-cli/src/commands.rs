use std::env;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use uuid::Uuid;

use appointment_cell::models::{AvailabilityResult, BookingQuery, TimeSlot};
use appointment_cell::services::availability::AvailabilityService;
use appointment_cell::services::booking::AppointmentBookingService;
use appointment_cell::services::flow::BookingFlow;
use shared_database::supabase::SupabaseClient;

#[derive(Debug, PartialEq)]
pub enum Command {
    Availability { health_center_id: Uuid, date: NaiveDate },
    Book {
        health_center_id: Uuid,
        service_id: Uuid,
        date: NaiveDate,
        time: TimeSlot,
        notes: Option<String>,
    },
    Appointments,
    Cancel { appointment_id: Uuid },
}

fn arg<'a>(args: &'a [String], i: usize, name: &str) -> Result<&'a str, String> {
    args.get(i).map(String::as_str).ok_or_else(|| format!("missing <{}>", name))
}

fn uuid_arg(args: &[String], i: usize, name: &str) -> Result<Uuid, String> {
    let raw = arg(args, i, name)?;
    Uuid::parse_str(raw).map_err(|_| format!("<{}> is not a UUID: {}", name, raw))
}

fn date_arg(args: &[String], i: usize) -> Result<NaiveDate, String> {
    let raw = arg(args, i, "date")?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| format!("invalid date: {}", raw))
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self, String> {
        match args.first().map(String::as_str) {
            Some("availability") => Ok(Command::Availability {
                health_center_id: uuid_arg(args, 1, "health-center-id")?,
                date: date_arg(args, 2)?,
            }),
            Some("book") => Ok(Command::Book {
                health_center_id: uuid_arg(args, 1, "health-center-id")?,
                service_id: uuid_arg(args, 2, "service-id")?,
                date: date_arg(args, 3)?,
                time: TimeSlot::parse(arg(args, 4, "time")?).map_err(|e| e.to_string())?,
                notes: args.get(5).cloned(),
            }),
            Some("appointments") => Ok(Command::Appointments),
            Some("cancel") => Ok(Command::Cancel {
                appointment_id: uuid_arg(args, 1, "appointment-id")?,
            }),
            Some(other) => Err(format!("unknown command: {}", other)),
            None => Err("no command given".to_string()),
        }
    }
}

fn patient_id() -> Result<Uuid> {
    let raw = env::var("PATIENT_ID").context("PATIENT_ID must be set")?;
    Uuid::parse_str(&raw).with_context(|| format!("PATIENT_ID is not a UUID: {}", raw))
}

fn print_availability(result: &AvailabilityResult) {
    if result.fail_open {
        println!("(could not load bookings, showing every slot)");
    }
    for slot in &result.available {
        println!("  {}  free", slot);
    }
    for slot in &result.booked {
        println!("  {}  booked", slot);
    }
}

pub async fn run(command: Command, supabase: Arc<SupabaseClient>, auth_token: &str) -> Result<()> {
    let availability = Arc::new(AvailabilityService::new(Arc::clone(&supabase)));
    let booking = Arc::new(AppointmentBookingService::new(supabase));

    match command {
        Command::Availability { health_center_id, date } => {
            let result = availability
                .resolve(&BookingQuery::new(health_center_id, date), auth_token)
                .await;
            print_availability(&result);
        }
        Command::Book { health_center_id, service_id, date, time, notes } => {
            let mut flow = BookingFlow::new(availability, booking, auth_token);
            flow.select_health_center(health_center_id).await?;
            flow.select_service(service_id).await?;
            flow.select_date(date).await?;
            flow.set_notes(notes)?;
            flow.select_time(time)?;

            let appointment = flow
                .submit(patient_id()?)
                .await
                .map_err(|e| anyhow!("{}", e.user_message()))?;
            println!(
                "Booked {} on {} at {} ({})",
                appointment.id, appointment.appointment_date, appointment.time, appointment.status
            );
        }
        Command::Appointments => {
            let appointments = booking
                .list_patient_appointments(patient_id()?, auth_token)
                .await
                .map_err(|e| anyhow!("{}", e.user_message()))?;
            if appointments.is_empty() {
                println!("No appointments");
            }
            for appointment in appointments {
                println!(
                    "{}  {} {}  {}",
                    appointment.id, appointment.appointment_date, appointment.time, appointment.status
                );
            }
        }
        Command::Cancel { appointment_id } => {
            let cancelled = booking
                .cancel_appointment(appointment_id, auth_token)
                .await
                .map_err(|e| anyhow!("{}", e.user_message()))?;
            println!("Cancelled {}", cancelled.id);
        }
    }

    Ok(())
}
