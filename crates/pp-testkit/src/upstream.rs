use async_trait::async_trait;

use pp_fuelcheck::{FuelCheckError, Upstream};
use pp_schemas::{Brand, Fueltype, InitState, Price, Station};

/// Upstream serving fixed snapshots. Gated like the real client: accessors
/// return nothing until `init` succeeds.
#[derive(Clone, Debug, Default)]
pub struct StaticUpstream {
    state: InitState,
    brands: Vec<Brand>,
    fueltypes: Vec<Fueltype>,
    stations: Vec<Station>,
    prices: Vec<Price>,
    init_error: Option<FuelCheckError>,
}

impl StaticUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_brands(mut self, brands: Vec<Brand>) -> Self {
        self.brands = brands;
        self
    }

    pub fn with_fueltypes(mut self, fueltypes: Vec<Fueltype>) -> Self {
        self.fueltypes = fueltypes;
        self
    }

    pub fn with_stations(mut self, stations: Vec<Station>) -> Self {
        self.stations = stations;
        self
    }

    pub fn with_prices(mut self, prices: Vec<Price>) -> Self {
        self.prices = prices;
        self
    }

    /// Make `init` fail with `err`.
    pub fn failing(mut self, err: FuelCheckError) -> Self {
        self.init_error = Some(err);
        self
    }

    fn gated<T: Clone>(&self, items: &[T]) -> Vec<T> {
        if self.state.is_ready() {
            items.to_vec()
        } else {
            Vec::new()
        }
    }
}

#[async_trait]
impl Upstream for StaticUpstream {
    fn name(&self) -> &'static str {
        "static-upstream"
    }

    fn state(&self) -> &InitState {
        &self.state
    }

    async fn init(&mut self) -> Result<(), FuelCheckError> {
        match &self.init_error {
            Some(err) => {
                self.state = InitState::Failed(err.to_string());
                Err(err.clone())
            }
            None => {
                self.state = InitState::Ready;
                Ok(())
            }
        }
    }

    fn brands(&self) -> Vec<Brand> {
        self.gated(&self.brands)
    }

    fn fueltypes(&self) -> Vec<Fueltype> {
        self.gated(&self.fueltypes)
    }

    fn stations(&self) -> Vec<Station> {
        self.gated(&self.stations)
    }

    fn prices(&self) -> Vec<Price> {
        self.gated(&self.prices)
    }
}
