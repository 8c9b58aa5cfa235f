// Fixed directory of common departure and arrival cities

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct City {
    pub name: &'static str,
    // IATA city or airport code
    pub code: &'static str,
    pub country: &'static str,
}

impl City {
    const fn new(name: &'static str, code: &'static str, country: &'static str) -> Self {
        Self {
            name,
            code,
            country,
        }
    }

    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.code)
    }
}

pub const COMMON_CITIES: &[City] = &[
    City::new("New York", "NYC", "US"),
    City::new("London", "LON", "GB"),
    City::new("Paris", "PAR", "FR"),
    City::new("Tokyo", "TYO", "JP"),
    City::new("Dubai", "DXB", "AE"),
    City::new("Singapore", "SIN", "SG"),
    City::new("Los Angeles", "LAX", "US"),
    City::new("Sydney", "SYD", "AU"),
    City::new("Mumbai", "BOM", "IN"),
    City::new("Delhi", "DEL", "IN"),
    City::new("Bangalore", "BLR", "IN"),
    City::new("Chennai", "MAA", "IN"),
    City::new("Kolkata", "CCU", "IN"),
    City::new("Hyderabad", "HYD", "IN"),
    City::new("Pune", "PNQ", "IN"),
    City::new("Ahmedabad", "AMD", "IN"),
    City::new("Kochi", "COK", "IN"),
    City::new("Lucknow", "LKO", "IN"),
    City::new("Jaipur", "JAI", "IN"),
    City::new("Chandigarh", "IXC", "IN"),
    City::new("Guwahati", "GAU", "IN"),
    City::new("Patna", "PAT", "IN"),
    City::new("Bhopal", "BHO", "IN"),
    City::new("Indore", "IDR", "IN"),
    City::new("Varanasi", "VNS", "IN"),
    City::new("Amritsar", "ATQ", "IN"),
    City::new("Goa", "GOI", "IN"),
    City::new("Nagpur", "NAG", "IN"),
    City::new("Vishakhapatnam", "VTZ", "IN"),
    City::new("Thiruvananthapuram", "TRV", "IN"),
    City::new("Coimbatore", "CJB", "IN"),
    City::new("Madurai", "IXM", "IN"),
    City::new("Mangalore", "IXE", "IN"),
    City::new("Bhubaneswar", "BBI", "IN"),
    City::new("Ranchi", "IXR", "IN"),
    City::new("Raipur", "RPR", "IN"),
    City::new("Jodhpur", "JDH", "IN"),
    City::new("Dehradun", "DED", "IN"),
    City::new("Imphal", "IMF", "IN"),
    City::new("Agartala", "IXA", "IN"),
    City::new("Aizawl", "AJL", "IN"),
    City::new("Dimapur", "DMU", "IN"),
    City::new("Silchar", "IXS", "IN"),
    City::new("Port Blair", "IXZ", "IN"),
];

pub fn find_by_code(code: &str) -> Option<&'static City> {
    let code = code.trim();
    COMMON_CITIES
        .iter()
        .find(|city| city.code.eq_ignore_ascii_case(code))
}

/// Cities whose name or code contains `input`, ignoring case. Blank input matches everything.
pub fn filter(input: &str) -> Vec<&'static City> {
    let needle = input.trim().to_lowercase();
    COMMON_CITIES
        .iter()
        .filter(|city| {
            needle.is_empty()
                || city.name.to_lowercase().contains(&needle)
                || city.code.to_lowercase().contains(&needle)
        })
        .collect()
}
