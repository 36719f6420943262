pub struct DefaultsConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout_secs: f64,
    pub connect_attempts: u32,
    pub retry_delay_secs: f64,
    pub wire_length_unit: String,
    pub wire_energy_unit: String,
    pub max_atoms: usize,
    pub force_constant: f64,
    pub replicas: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 31415,
            connect_timeout_secs: 10.0,
            connect_attempts: 1,
            retry_delay_secs: 1.0,
            wire_length_unit: "bohr".to_string(),
            wire_energy_unit: "hartree".to_string(),
            max_atoms: 10_000_000,
            force_constant: 100.0,
            replicas: 1,
        }
    }
}
