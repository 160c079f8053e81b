//! Plain-text tables for the terminal.

use garagedesk_core::models::{Appointment, Customer, Employee, InventoryItem, JobCard, Vehicle};
use garagedesk_core::utils::{format_currency, format_optional, format_phone, truncate_string};
use garagedesk_core::JobBoard;

const NAME_WIDTH: usize = 24;
const DESCRIPTION_WIDTH: usize = 40;

fn id_or_dash(id: Option<i64>) -> String {
    id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string())
}

pub fn print_customers(customers: &[Customer]) {
    if customers.is_empty() {
        println!("No clients.");
        return;
    }
    println!("{:>5}  {:<NAME_WIDTH$}  {:<16}  {}", "ID", "NAME", "PHONE", "EMAIL");
    for c in customers {
        println!(
            "{:>5}  {:<NAME_WIDTH$}  {:<16}  {}",
            id_or_dash(c.id),
            truncate_string(&c.full_name(), NAME_WIDTH),
            c.phone.as_deref().map(format_phone).unwrap_or_default(),
            format_optional(c.email.as_deref(), "-"),
        );
    }
}

pub fn print_vehicles(vehicles: &[Vehicle]) {
    if vehicles.is_empty() {
        println!("No vehicles.");
        return;
    }
    println!("{:>5}  {:<NAME_WIDTH$}  {:<10}  {:>7}  {}", "ID", "VEHICLE", "PLATE", "CLIENT", "VIN");
    for v in vehicles {
        println!(
            "{:>5}  {:<NAME_WIDTH$}  {:<10}  {:>7}  {}",
            id_or_dash(v.id),
            truncate_string(&v.description(), NAME_WIDTH),
            format_optional(v.plate_number.as_deref(), "-"),
            id_or_dash(v.client),
            format_optional(v.vin.as_deref(), "-"),
        );
    }
}

pub fn print_employees(employees: &[Employee]) {
    if employees.is_empty() {
        println!("No employees.");
        return;
    }
    println!("{:>5}  {:<NAME_WIDTH$}  {:<16}  {}", "ID", "NAME", "ROLE", "PHONE");
    for e in employees {
        println!(
            "{:>5}  {:<NAME_WIDTH$}  {:<16}  {}",
            id_or_dash(e.id),
            truncate_string(&e.full_name(), NAME_WIDTH),
            format_optional(e.role.as_deref(), "-"),
            e.phone.as_deref().map(format_phone).unwrap_or_default(),
        );
    }
}

pub fn print_inventory(items: &[InventoryItem]) {
    if items.is_empty() {
        println!("No inventory items.");
        return;
    }
    println!("{:>5}  {:<NAME_WIDTH$}  {:<12}  {:>5}  {:>10}", "ID", "PART", "NUMBER", "QTY", "PRICE");
    for item in items {
        let flag = if item.needs_reorder() { "  reorder" } else { "" };
        println!(
            "{:>5}  {:<NAME_WIDTH$}  {:<12}  {:>5}  {:>10}{}",
            id_or_dash(item.id),
            truncate_string(&item.name, NAME_WIDTH),
            format_optional(item.part_number.as_deref(), "-"),
            item.quantity,
            item.unit_price.map(format_currency).unwrap_or_default(),
            flag,
        );
    }
}

pub fn print_appointments(appointments: &[Appointment]) {
    if appointments.is_empty() {
        println!("No appointments.");
        return;
    }
    println!("{:>5}  {:<17}  {:>7}  {:>8}  {}", "ID", "WHEN (UTC)", "CLIENT", "VEHICLE", "NOTES");
    for a in appointments {
        println!(
            "{:>5}  {:<17}  {:>7}  {:>8}  {}",
            id_or_dash(a.id),
            a.scheduled_for.format("%Y-%m-%d %H:%M"),
            id_or_dash(a.client),
            id_or_dash(a.vehicle),
            truncate_string(a.notes.as_deref().unwrap_or(""), DESCRIPTION_WIDTH),
        );
    }
}

fn print_card(card: &JobCard) {
    let cost = card
        .estimated_cost
        .map(|c| format!("  est. {}", format_currency(c)))
        .unwrap_or_default();
    println!(
        "  #{:<5} {}{}",
        card.id,
        truncate_string(&card.description, DESCRIPTION_WIDTH),
        cost
    );
}

pub fn print_board(board: &JobBoard) {
    if board.is_empty() {
        println!("No job cards.");
        return;
    }
    for (status, cards) in board.columns() {
        println!("{} ({})", status.label(), cards.len());
        for card in cards {
            print_card(card);
        }
        println!();
    }
}

pub fn print_summary(customers: usize, vehicles: usize, board: &JobBoard, inventory: &[InventoryItem]) {
    println!("Clients:   {}", customers);
    println!("Vehicles:  {}", vehicles);
    println!("Job cards: {}", board.len());
    for (status, cards) in board.columns() {
        println!("  {:<15} {}", status.label(), cards.len());
    }
    let low = inventory.iter().filter(|item| item.needs_reorder()).count();
    println!("Inventory: {} items, {} to reorder", inventory.len(), low);
}
