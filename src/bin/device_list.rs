use std::error::Error;
use voxturn::audio::{self, AudioCapturer};

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    println!("Available audio input devices:");
    let devices = match audio::list_input_devices("voxturn-device-list") {
        Ok(devices) => devices,
        Err(e) => {
            println!("Error listing devices: {}", e);
            return Ok(());
        }
    };

    for (i, device) in devices.iter().enumerate() {
        println!("{}: {}", i, device.description);
        println!("   Name: {}", device.name);
        println!(
            "   Rate: {} Hz, Channels: {}",
            device.sample_rate, device.channels
        );
        println!();
    }

    println!("Testing direct device connections...");
    for device in &devices {
        match AudioCapturer::with_device("voxturn-device-list", &device.name) {
            Ok(_) => println!("  {} ... ok", device.name),
            Err(e) => println!("  {} ... failed: {}", device.name, e),
        }
    }

    Ok(())
}
