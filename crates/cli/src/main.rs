use anyhow::Context;
use clap::{Parser, Subcommand};
use dxr_core::{
    attachments::store_attachment,
    config::{data_dir_from_env_value, namespace_from_env_value},
    CaseId, CoreConfig, DiagnosisEntry, DiagnosisService, NewDoctor, NewPatient, PatientId,
    Resolution, StoreBackend, SubmitDiagnosis,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "dxr")]
#[command(about = "DXR diagnosis case record CLI")]
struct Cli {
    /// Data directory (defaults to DXR_DATA_DIR, then ./patient_data)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Namespace used in commit author e-mails (defaults to DXR_NAMESPACE)
    #[arg(long, global = true)]
    namespace: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a patient
    CreatePatient {
        #[arg(long)]
        name: String,
        #[arg(long)]
        age: i64,
        #[arg(long)]
        weight_kg: f64,
        #[arg(long)]
        height_cm: f64,
        #[arg(long)]
        gender: String,
    },
    /// Register a doctor
    RegisterDoctor {
        #[arg(long)]
        name: String,
        #[arg(long)]
        specialty: Option<String>,
    },
    /// Submit a diagnosis entry
    Submit {
        #[arg(long)]
        patient_id: String,
        #[arg(long)]
        doctor_id: String,
        #[arg(long)]
        case_id: String,
        #[arg(long)]
        symptoms: String,
        #[arg(long)]
        assessment: String,
        #[arg(long)]
        prescription: Option<String>,
        /// Local report document to store with the patient record
        #[arg(long, conflicts_with = "report_path")]
        report_file: Option<PathBuf>,
        /// Already stored report reference
        #[arg(long)]
        report_path: Option<String>,
        /// Local image to store with the patient record
        #[arg(long, conflicts_with = "image_path")]
        image_file: Option<PathBuf>,
        /// Already stored image reference
        #[arg(long)]
        image_path: Option<String>,
    },
    /// List the case ids a patient has entries under
    CaseIds {
        patient_id: String,
    },
    /// Show every entry of one case, oldest first
    Timeline {
        patient_id: String,
        case_id: String,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dxr=info".parse()?)
                .add_directive("dxr_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use 'dxr --help' for commands");
        return Ok(());
    };

    let cfg = Arc::new(build_config(cli.data_dir, cli.namespace)?);
    let service = DiagnosisService::from_config(cfg.clone())
        .with_context(|| format!("cannot open data directory {}", cfg.data_dir().display()))?;

    match command {
        Commands::CreatePatient {
            name,
            age,
            weight_kg,
            height_cm,
            gender,
        } => {
            let patient = service.create_patient(NewPatient {
                name: Some(name),
                age: Some(age),
                weight_kg: Some(weight_kg),
                height_cm: Some(height_cm),
                gender: Some(gender),
            })?;
            println!("Created patient with ID: {}", patient.id);
        }
        Commands::RegisterDoctor { name, specialty } => {
            let doctor = service.register_doctor(NewDoctor {
                name: Some(name),
                specialty,
            })?;
            println!("Registered doctor with ID: {}", doctor.id);
        }
        Commands::Submit {
            patient_id,
            doctor_id,
            case_id,
            symptoms,
            assessment,
            prescription,
            report_file,
            report_path,
            image_file,
            image_path,
        } => {
            let report_path = attachment_reference(&cfg, &patient_id, report_file, report_path)?;
            let image_path = attachment_reference(&cfg, &patient_id, image_file, image_path)?;

            let outcome = service.submit(SubmitDiagnosis {
                patient_id: Some(patient_id),
                doctor_id: Some(doctor_id),
                case_id: Some(case_id),
                symptoms: Some(symptoms),
                clinical_assessment: Some(assessment),
                prescription,
                report_path,
                image_path,
            })?;
            let verb = match outcome.case_status {
                dxr_core::CaseStatus::Opened => "Opened",
                dxr_core::CaseStatus::Extended => "Extended",
            };
            println!(
                "{verb} case '{}' (entry {}, {} earlier entries)",
                outcome.entry.case_id(),
                outcome.entry.id(),
                outcome.prior_entries
            );
        }
        Commands::CaseIds { patient_id } => {
            let patient_id = PatientId::parse(&patient_id)?;
            let case_ids = service.list_case_ids(&patient_id)?;
            if case_ids.is_empty() {
                println!("No diagnosis entries for patient {patient_id}.");
            } else {
                for case_id in case_ids {
                    println!("{case_id}");
                }
            }
        }
        Commands::Timeline {
            patient_id,
            case_id,
        } => {
            let patient_id = PatientId::parse(&patient_id)?;
            let case_id = CaseId::new(&case_id)?;
            match service.resolve_timeline(&patient_id, &case_id)? {
                Resolution::Found(timeline) => {
                    for entry in timeline.entries() {
                        print_entry(entry);
                    }
                }
                Resolution::NotFound => println!(
                    "No entries under case '{case_id}'. Submitting a diagnosis with this case id will open it."
                ),
            }
        }
    }

    Ok(())
}

fn build_config(data_dir: Option<PathBuf>, namespace: Option<String>) -> anyhow::Result<CoreConfig> {
    let data_dir = data_dir
        .unwrap_or_else(|| data_dir_from_env_value(std::env::var("DXR_DATA_DIR").ok().as_deref()));
    let namespace = match namespace {
        Some(ns) => namespace_from_env_value(Some(&ns))?,
        None => namespace_from_env_value(std::env::var("DXR_NAMESPACE").ok().as_deref())?,
    };
    Ok(CoreConfig::new(data_dir, namespace, StoreBackend::File)?)
}

/// Store a local file if one was given, otherwise pass the reference through.
fn attachment_reference(
    cfg: &CoreConfig,
    patient_id: &str,
    file: Option<PathBuf>,
    reference: Option<String>,
) -> anyhow::Result<Option<String>> {
    match file {
        Some(file) => {
            let patient_id = PatientId::parse(patient_id)?;
            let metadata = store_attachment(cfg, &patient_id, &file)
                .with_context(|| format!("cannot store {}", file.display()))?;
            tracing::info!(
                source = %file.display(),
                reference = %metadata.relative_path,
                size_bytes = metadata.size_bytes,
                "attachment stored"
            );
            Ok(Some(metadata.relative_path.as_str().to_string()))
        }
        None => Ok(reference),
    }
}

fn print_entry(entry: &DiagnosisEntry) {
    println!("#{} {}", entry.sequence(), entry.created_at().to_rfc3339());
    println!("  doctor:     {}", entry.doctor_id());
    println!("  symptoms:   {}", entry.symptoms());
    println!("  assessment: {}", entry.clinical_assessment());
    if let Some(prescription) = entry.prescription() {
        println!("  prescribed: {prescription}");
    }
    for (label, path) in [("report", entry.report_path()), ("image", entry.image_path())] {
        if let Some(path) = path {
            println!("  {label}:     {path}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn report_file_and_path_conflict() {
        let result = Cli::try_parse_from([
            "dxr",
            "submit",
            "--patient-id",
            "p",
            "--doctor-id",
            "d",
            "--case-id",
            "DX-1",
            "--symptoms",
            "fever",
            "--assessment",
            "flu",
            "--report-file",
            "a.pdf",
            "--report-path",
            "files/x",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn global_data_dir_after_subcommand() {
        let cli = Cli::try_parse_from(["dxr", "case-ids", "abc", "--data-dir", "/tmp/dxr"]).unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/dxr")));
        assert!(matches!(cli.command, Some(Commands::CaseIds { .. })));
    }

    #[test]
    fn explicit_namespace_is_validated() {
        assert!(build_config(Some(PathBuf::from("data")), Some("bad ns".into())).is_err());
        let cfg = build_config(Some(PathBuf::from("data")), Some("dxr.test.1".into())).unwrap();
        assert_eq!(cfg.namespace(), "dxr.test.1");
    }
}
