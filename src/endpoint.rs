/// Endpoints of the GENESIS-Online `data` service.
///
/// The upstream `*file` endpoints (`cubefile`, `resultfile`, `tablefile`,
/// `timeseriesfile`) are not wrapped: normalization makes them redundant,
/// call the plain variant instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Chart2Result,
    Chart2Table,
    Chart2Timeseries,
    Cube,
    Map2Result,
    Map2Table,
    Map2Timeseries,
    Result,
    Table,
    Timeseries,
}

impl Endpoint {
    pub const ALL: [Endpoint; 10] = [
        Endpoint::Chart2Result,
        Endpoint::Chart2Table,
        Endpoint::Chart2Timeseries,
        Endpoint::Cube,
        Endpoint::Map2Result,
        Endpoint::Map2Table,
        Endpoint::Map2Timeseries,
        Endpoint::Result,
        Endpoint::Table,
        Endpoint::Timeseries,
    ];

    /// Name of the service the endpoint belongs to.
    pub fn service(self) -> &'static str {
        "data"
    }

    /// Method segment of the endpoint URL.
    pub fn method(self) -> &'static str {
        match self {
            Endpoint::Chart2Result => "chart2result",
            Endpoint::Chart2Table => "chart2table",
            Endpoint::Chart2Timeseries => "chart2timeseries",
            Endpoint::Cube => "cube",
            Endpoint::Map2Result => "map2result",
            Endpoint::Map2Table => "map2table",
            Endpoint::Map2Timeseries => "map2timeseries",
            Endpoint::Result => "result",
            Endpoint::Table => "table",
            Endpoint::Timeseries => "timeseries",
        }
    }

    /// URL path segment relative to the API base URL.
    pub fn path(self) -> String {
        format!("{}/{}", self.service(), self.method())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_service_scoped() {
        assert_eq!(Endpoint::Table.path(), "data/table");
        assert_eq!(Endpoint::Chart2Timeseries.path(), "data/chart2timeseries");
        assert_eq!(Endpoint::ALL.len(), 10);
    }
}
