mod report;

use self::report::{report_properties, report_scf_summary, report_sweep};
use crate::config::{Args, Config};
use crate::io::{setup_output, write_dos_table, write_sweep_table};
use clap::Parser;
use color_eyre::eyre::{eyre, Result, WrapErr};
use cuc_scf::sweep::{best_point, height_grid, run_height_sweep};
use cuc_scf::TightBindingScf;
use std::fs::{self, File};
use tracing::info;

pub struct ScfApplication {
    args: Args,
    config: Config,
}

impl ScfApplication {
    pub fn from_cli() -> Result<Self> {
        let args = Args::parse();
        let config = load_config(&args)?;
        Ok(Self { args, config })
    }

    pub fn run(self) -> Result<()> {
        setup_output(self.args.output.as_ref());
        info!("Configuration loaded:\n{:?}", self.config);

        self.config
            .validate()
            .wrap_err("Invalid SCF configuration")?;

        if self.config.is_sweep_enabled() {
            self.run_sweep()
        } else {
            self.run_single()
        }
    }

    fn run_single(&self) -> Result<()> {
        let atoms = self
            .config
            .atomic_configuration()
            .wrap_err("Failed to prepare geometry")?;
        let engine = TightBindingScf::new(atoms, self.config.scf_settings())?;

        info!("\nStarting SCF cycle...\n");
        let result = engine.scf_cycle().wrap_err("SCF cycle failed")?;
        report_scf_summary(&engine, &result);

        let props = engine
            .properties(&result)
            .wrap_err("Property estimation failed")?;
        report_properties(&props);

        if let Some(path) = &self.config.properties.dos_output {
            let mut file = File::create(path)
                .wrap_err_with(|| format!("Unable to create DOS output file: {}", path))?;
            write_dos_table(&mut file, &props.dos)?;
            info!("DOS written to {}", path);
        }
        Ok(())
    }

    fn run_sweep(&self) -> Result<()> {
        if self.config.geometry.is_some() {
            return Err(eyre!(
                "The copper-height sweep needs a generated cluster, not an explicit geometry"
            ));
        }
        let sweep = self.config.sweep.clone().unwrap_or_default().with_defaults();
        let heights = height_grid(
            sweep.start.unwrap_or(1.5),
            sweep.end.unwrap_or(3.5),
            sweep.points.unwrap_or(9),
        );

        let results = run_height_sweep(
            &self.config.cluster_geometry(),
            &self.config.scf_settings(),
            &heights,
        );
        let points = report_sweep(&heights, &results);
        if let Some(best) = best_point(&results) {
            info!(
                "Best copper height: {:.4} A (conductivity {:.6})",
                best.copper_height, best.conductivity
            );
        }

        let mut stdout = std::io::stdout();
        write_sweep_table(&mut stdout, &points)?;
        Ok(())
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let config = match &args.config_file {
        Some(path) => {
            let content = fs::read_to_string(path)
                .wrap_err_with(|| format!("Unable to read configuration file: {}", path))?;
            serde_yml::from_str::<Config>(&content)
                .wrap_err("Failed to parse configuration file")?
        }
        None => Config::default(),
    };
    Ok(config.with_defaults().apply_overrides(args))
}
