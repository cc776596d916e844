//! Launches rct2.exe and injects the payload DLL into it.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    game_path: String,
    process_name: String,
    dll_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            game_path: "C:\\Program Files (x86)\\Infogrames\\RollerCoaster Tycoon 2\\rct2.exe"
                .into(),
            process_name: "rct2.exe".into(),
            dll_path: "target\\i686-pc-windows-msvc\\debug\\rct2injection.dll".into(),
        }
    }
}

fn load_config() -> Result<Config, eyre::Error> {
    match std::fs::read_to_string("rct2hook.json") {
        Ok(text) => Ok(serde_json::from_str(&text)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(windows)]
fn main() -> Result<(), eyre::Error> {
    use dll_syringe::{
        process::{OwnedProcess, Process},
        Syringe,
    };

    let config = load_config()?;

    println!("Launching RollerCoaster Tycoon 2");
    std::process::Command::new(&config.game_path).spawn()?;

    // Loop rapidly instead of sleeping a fixed time, so the payload is in
    // place before the game finishes initializing.
    let target_process = loop {
        if let Some(process) = OwnedProcess::find_first_by_name(&config.process_name) {
            break process;
        }
    };

    println!("Found game process.");

    let syringe = Syringe::for_process(target_process);

    println!("Injecting DLL.");
    syringe.inject(&config.dll_path)?;
    println!("DLL injected.");

    Ok(())
}

#[cfg(not(windows))]
fn main() -> Result<(), eyre::Error> {
    let config = load_config()?;
    eprintln!(
        "rct2injector only runs on Windows, where {} can exist \
         (would launch {} and inject {}).",
        config.process_name, config.game_path, config.dll_path
    );
    Ok(())
}
