use bedflow_core::{
    config::{
        cleaning_minutes_from_env_value, load_bed_seed, overflow_ward_from_env_value,
        ward_priority_from_env_value,
    },
    constants::DEFAULT_DATA_FILE,
    Actor, AllocationService, Bed, BedNumber, BedRequest, BedStatus, CoreConfig, Demographics,
    EquipmentTag, FileStore, LogSink, NewRequest, Patient, RecordUuid, RequestMode,
    RequestPriority, RequestSubject, StaffRole, WardName,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "bedflow")]
#[command(about = "Bedflow hospital bed allocation CLI")]
struct Cli {
    /// YAML data file holding beds, patients and requests
    #[arg(long, env = "BEDFLOW_DATA_FILE", default_value = DEFAULT_DATA_FILE)]
    data: PathBuf,
    /// Role to act as
    #[arg(long, env = "BEDFLOW_ROLE", default_value = "HOSPITAL_ADMIN")]
    role: StaffRole,
    /// Staff id recorded on requests
    #[arg(long, env = "BEDFLOW_STAFF_ID", default_value = "cli")]
    staff_id: String,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision beds from a YAML seed file; existing beds are kept
    Seed {
        file: PathBuf,
    },
    /// List beds
    Beds {
        /// Only beds in this ward
        #[arg(long)]
        ward: Option<String>,
        /// Only available beds
        #[arg(long)]
        available: bool,
    },
    /// Recommend a bed without reserving it
    Recommend {
        /// Ward hint (ignored with --emergency)
        #[arg(long, default_value = "General Ward")]
        ward: String,
        /// Required equipment (comma-separated)
        #[arg(long, value_delimiter = ',')]
        equipment: Vec<String>,
        /// Search the ward priority list instead of the ward hint
        #[arg(long)]
        emergency: bool,
        /// Only look inside the ward, without overflow fallback
        #[arg(long, conflicts_with = "emergency")]
        ward_only: bool,
    },
    /// Admit a new patient to a bed
    Admit {
        bed: BedNumber,
        name: String,
        #[arg(long)]
        age: u8,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        department: Option<String>,
        /// Estimated stay in days
        #[arg(long)]
        stay_days: Option<u32>,
    },
    /// Discharge a patient; the bed goes to cleaning
    Discharge {
        patient: String,
    },
    /// Move an admitted patient to another bed
    Transfer {
        patient: String,
        bed: BedNumber,
    },
    /// Set a bed's status (available, cleaning, reserved, maintenance)
    SetStatus {
        bed: BedNumber,
        status: BedStatus,
    },
    /// Return beds whose cleaning time has passed to available
    CompleteCleaning,
    /// List patients
    Patients,
    /// List bed requests
    Requests,
    /// File a bed request for a walk-in or an existing patient
    Request {
        ward: String,
        /// Walk-in patient name
        #[arg(long, conflicts_with = "patient", required_unless_present = "patient")]
        name: Option<String>,
        /// Existing patient id
        #[arg(long)]
        patient: Option<String>,
        #[arg(long, value_delimiter = ',')]
        equipment: Vec<String>,
        #[arg(long, default_value = "routine")]
        priority: RequestPriority,
        #[arg(long)]
        emergency: bool,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Approve a request, admitting its patient
    Approve {
        id: String,
        #[arg(long)]
        bed: Option<BedNumber>,
    },
    /// Reserve a bed for a pending request
    Reserve {
        id: String,
        #[arg(long)]
        bed: Option<BedNumber>,
    },
    /// Reject a pending request
    Reject {
        id: String,
        #[arg(long, default_value = "")]
        reason: String,
    },
    /// Cancel a request
    Cancel {
        id: String,
    },
    /// Mark a request fulfilled
    Fulfil {
        id: String,
    },
    /// Show bed counts for a ward
    Occupancy {
        ward: String,
    },
    /// Check bed/patient links in the data file
    Audit,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let Some(command) = cli.command else {
        println!("Use 'bedflow --help' for commands");
        return Ok(());
    };

    let cfg = CoreConfig::new(
        overflow_ward_from_env_value(std::env::var("BEDFLOW_OVERFLOW_WARD").ok())?,
        ward_priority_from_env_value(std::env::var("BEDFLOW_WARD_PRIORITY").ok())?,
        cleaning_minutes_from_env_value(std::env::var("BEDFLOW_CLEANING_MINUTES").ok())?,
    )?;
    let store = Arc::new(FileStore::open(&cli.data)?);
    let service = AllocationService::new(Arc::new(cfg), store, Arc::new(LogSink));
    let actor = Actor::new(cli.staff_id, cli.role);

    match command {
        Commands::Seed { file } => {
            let added = service.provision_beds(load_bed_seed(&file)?)?;
            println!("Provisioned {} new bed(s)", added.len());
        }
        Commands::Beds { ward, available } => {
            let ward = ward.map(WardName::new).transpose()?;
            let beds = if available {
                service.available_beds(ward.as_ref())?
            } else {
                service
                    .beds()?
                    .into_iter()
                    .filter(|b| ward.as_ref().map_or(true, |w| b.in_ward(w)))
                    .collect()
            };
            if beds.is_empty() {
                println!("No beds found.");
            }
            for bed in &beds {
                print_bed(bed);
            }
        }
        Commands::Recommend {
            ward,
            equipment,
            emergency,
            ward_only,
        } => {
            let tags = parse_tags(&equipment)?;
            let bed = if emergency {
                service.recommend_bed_global(&tags)?
            } else if ward_only {
                service.recommend_bed_in_ward(&WardName::new(&ward)?, &tags)?
            } else {
                service.recommend_bed(&WardName::new(&ward)?, &tags)?
            };
            match bed {
                Some(bed) => print_bed(&bed),
                None => println!("No available bed."),
            }
        }
        Commands::Admit {
            bed,
            name,
            age,
            reason,
            department,
            stay_days,
        } => {
            let demographics = Demographics {
                name,
                age: Some(age),
                department,
                reason_for_admission: Some(reason),
                estimated_stay_days: stay_days,
                ..Demographics::default()
            };
            let patient = service.admit_patient(&actor, &demographics, &bed)?;
            print_patient(&patient);
        }
        Commands::Discharge { patient } => {
            let patient = service.discharge_patient(&actor, &RecordUuid::parse(&patient)?)?;
            print_patient(&patient);
        }
        Commands::Transfer { patient, bed } => {
            let patient = service.transfer_patient(&actor, &RecordUuid::parse(&patient)?, &bed)?;
            print_patient(&patient);
        }
        Commands::SetStatus { bed, status } => {
            let bed = service.set_bed_status(&actor, &bed, status, None)?;
            print_bed(&bed);
        }
        Commands::CompleteCleaning => {
            let ready = service.complete_cleaning(chrono::Utc::now())?;
            println!("{} bed(s) returned to available", ready.len());
        }
        Commands::Patients => {
            let patients = service.patients()?;
            if patients.is_empty() {
                println!("No patients found.");
            }
            for patient in &patients {
                print_patient(patient);
            }
        }
        Commands::Requests => {
            let requests = service.requests()?;
            if requests.is_empty() {
                println!("No requests found.");
            }
            for request in &requests {
                print_request(request);
            }
        }
        Commands::Request {
            ward,
            name,
            patient,
            equipment,
            priority,
            emergency,
            notes,
        } => {
            let subject = match (patient, name) {
                (Some(id), _) => RequestSubject::Patient {
                    patient: RecordUuid::parse(&id)?,
                },
                (None, name) => RequestSubject::WalkIn {
                    demographics: Demographics {
                        name: name.unwrap_or_default(),
                        ..Demographics::default()
                    },
                },
            };
            let request = service.create_request(
                &actor,
                NewRequest {
                    subject,
                    ward: WardName::new(&ward)?,
                    equipment: parse_tags(&equipment)?,
                    priority,
                    mode: if emergency {
                        RequestMode::Emergency
                    } else {
                        RequestMode::Standard
                    },
                    notes,
                },
            )?;
            print_request(&request);
        }
        Commands::Approve { id, bed } => {
            let request = service.approve_request(&actor, &RecordUuid::parse(&id)?, bed.as_ref())?;
            print_request(&request);
        }
        Commands::Reserve { id, bed } => {
            let request = service.reserve_bed(&actor, &RecordUuid::parse(&id)?, bed.as_ref())?;
            print_request(&request);
        }
        Commands::Reject { id, reason } => {
            let request = service.reject_request(&actor, &RecordUuid::parse(&id)?, &reason)?;
            print_request(&request);
        }
        Commands::Cancel { id } => {
            let request = service.cancel_request(&actor, &RecordUuid::parse(&id)?)?;
            print_request(&request);
        }
        Commands::Fulfil { id } => {
            let request = service.fulfil_request(&actor, &RecordUuid::parse(&id)?)?;
            print_request(&request);
        }
        Commands::Occupancy { ward } => {
            let o = service.ward_occupancy(&WardName::new(&ward)?)?;
            println!(
                "{}: {} beds, {} available, {} occupied, {} cleaning, {} reserved, {} maintenance ({:.0}% occupied)",
                o.ward,
                o.total,
                o.available,
                o.occupied,
                o.cleaning,
                o.reserved,
                o.maintenance,
                o.occupancy_percent()
            );
        }
        Commands::Audit => {
            let problems = service.audit()?;
            if problems.is_empty() {
                println!("All bed/patient links are consistent.");
            }
            for problem in problems {
                println!("{problem}");
            }
        }
    }

    Ok(())
}

fn parse_tags(raw: &[String]) -> Result<Vec<EquipmentTag>, bedflow_core::AllocationError> {
    raw.iter()
        .filter(|t| !t.trim().is_empty())
        .map(|t| EquipmentTag::new(t).map_err(Into::into))
        .collect()
}

fn print_bed(bed: &Bed) {
    let equipment: Vec<&str> = bed.equipment.iter().map(|e| e.as_str()).collect();
    println!(
        "{}  {}  floor {}  {}  [{}]{}",
        bed.number,
        bed.ward,
        bed.floor,
        bed.status,
        equipment.join(", "),
        bed.current_patient
            .map(|p| format!("  patient {p}"))
            .unwrap_or_default()
    );
}

fn print_patient(patient: &Patient) {
    println!(
        "ID: {}, Code: {}, Name: {}, Status: {}, Bed: {}",
        patient.id,
        patient.code,
        patient.name,
        patient.status,
        patient
            .assigned_bed
            .as_ref()
            .map_or("-".to_owned(), ToString::to_string)
    );
}

fn print_request(request: &BedRequest) {
    let recommended: Vec<String> = request
        .recommended_beds
        .iter()
        .map(ToString::to_string)
        .collect();
    println!(
        "ID: {}, Ward: {}, Status: {}, Recommended: [{}], Assigned: {}",
        request.id,
        request.ward,
        request.status,
        recommended.join(", "),
        request
            .assigned_bed
            .as_ref()
            .map_or("-".to_owned(), ToString::to_string)
    );
}
