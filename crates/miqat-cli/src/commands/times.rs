use std::io::Write;
use std::sync::Arc;

use chrono::NaiveDate;
use miqat_core::prayer::find_next;
use miqat_core::timer::Remaining;
use miqat_core::{AdjustedTimeTable, Clock, Event, PrayerService, SystemClock};
use tokio::sync::mpsc::unbounded_channel;

use crate::app::App;
use crate::platform;

fn print_table(table: &AdjustedTimeTable, label: &str) {
    println!("{} ({label})", table.date);
    for (boundary, time) in table.timings.iter() {
        match table.adjustments.get(boundary) {
            0 => println!("  {:<9} {time}", boundary.label()),
            adj => println!("  {:<9} {time}  ({adj:+})", boundary.label()),
        }
    }
    if table.fallback {
        println!("  prayer time service unreachable; showing approximate times");
    }
}

pub async fn times(date: Option<NaiveDate>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let app = App::open()?;
    let resolution = app.resolver().resolve().await?;
    let date = date.unwrap_or_else(|| SystemClock.now().date());
    let table = app.schedule()?.build(date, resolution.coordinate).await?;

    if json {
        let out = serde_json::json!({
            "location": resolution,
            "table": table,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        if let Some(notice) = resolution.notice() {
            eprintln!("{notice}");
        }
        print_table(&table, &resolution.label);
    }
    Ok(())
}

pub async fn next(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let app = App::open()?;
    let resolution = app.resolver().resolve().await?;
    let now = SystemClock.now();
    let table = app.schedule()?.build(now.date(), resolution.coordinate).await?;
    let next = find_next(&table, now);
    let remaining = Remaining::from_duration(next.remaining(now));

    if json {
        let out = serde_json::json!({
            "next": next,
            "remaining": remaining.to_string(),
            "fallback": table.fallback,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!(
            "{} at {} (in {remaining})",
            next.boundary.label(),
            next.time
        );
    }
    Ok(())
}

fn render(event: &Event, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }
    let mut out = std::io::stdout();
    match event {
        Event::LocationResolved { resolution, .. } => {
            if let Some(notice) = resolution.notice() {
                eprintln!("{notice}");
            }
            println!("location: {} ({})", resolution.label, resolution.coordinate);
        }
        Event::ScheduleBuilt { date, fallback, .. } => {
            let note = if *fallback { " (approximate)" } else { "" };
            println!("schedule for {date}{note}");
        }
        Event::CountdownTick {
            boundary, display, ..
        } => {
            write!(out, "\r{} in {display} ", boundary.label())?;
            out.flush()?;
        }
        Event::BoundaryArrived { boundary, .. } => {
            println!("\n{} has arrived", boundary.label());
        }
        Event::AlarmScheduled {
            boundary, fire_at, ..
        } => {
            println!("\n{} alarm set for {fire_at}", boundary.label());
        }
        Event::NotificationSuppressed { tag, reason, .. } => {
            eprintln!("\nnotification for {tag} not shown: {reason}");
        }
        Event::CountdownStarted { .. }
        | Event::CountdownRetargeted { .. }
        | Event::AlarmFired { .. }
        | Event::AlarmSkipped { .. } => {}
    }
    Ok(())
}

pub async fn watch(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let app = App::open()?;
    let (tx, mut rx) = unbounded_channel();
    let mut service = PrayerService::new(
        &app.config,
        app.kv(),
        app.provider()?,
        Arc::new(platform::EnvLocator),
        platform::alerts(&app.config.notifications),
        Arc::new(SystemClock),
        Some(tx),
    );
    let next = service.start().await?;
    tracing::info!(boundary = %next.boundary, target = %next.target, "watching; Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Some(event) = rx.recv() => render(&event, json)?,
        }
    }
    service.stop();
    println!();
    Ok(())
}
