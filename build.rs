fn main() {
    for var in [
        "GARDEN_WIFI1_SSID",
        "GARDEN_WIFI1_IDENTITY",
        "GARDEN_WIFI1_PASSWORD",
        "GARDEN_WIFI2_SSID",
        "GARDEN_WIFI2_PASSWORD",
        "GARDEN_MQTT_SERVER1",
        "GARDEN_MQTT_SERVER2",
    ] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    // Host builds (tests, fuzzing) have no ESP-IDF environment to export.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
