use crate::error::QueryError;
use crate::model::{Collection, EncodeContext, Field, Param, ParamMap, PlayerIndex, QueryArgs};

/// Physical requests for one logical query, plus anything the caller should be told.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestPlan {
    pub requests: Vec<ParamMap>,
    pub advisories: Vec<String>,
    pub estimated_rows: Option<f64>,
}

/// Anything that can be turned into a list of requests against one URL.
pub trait RequestPlanner {
    /// Path appended to the service base URL.
    fn url_path(&self) -> &str;

    /// # Errors
    ///
    /// Will return `Err` if the accumulated parameters cannot be split into requests
    fn plan(&self) -> Result<RequestPlan, QueryError>;
}

/// Accumulates encoded parameters for one collection.
///
/// Adding a field whose slug is already present overwrites it.
pub struct Query<'r> {
    collection: &'r Collection,
    players: &'r dyn PlayerIndex,
    params: ParamMap,
}

impl<'r> Query<'r> {
    #[must_use]
    pub fn new(collection: &'r Collection, players: &'r dyn PlayerIndex) -> Self {
        Self {
            collection,
            players,
            params: ParamMap::new(),
        }
    }

    /// Build a query from every argument in `args`, in order.
    ///
    /// # Errors
    ///
    /// Will return `Err` on the first unknown field or invalid value
    pub fn from_args(
        collection: &'r Collection,
        players: &'r dyn PlayerIndex,
        args: &QueryArgs,
    ) -> Result<Self, QueryError> {
        let mut query = Self::new(collection, players);
        for (name, value) in args.iter() {
            query.add(name, value)?;
        }
        Ok(query)
    }

    /// # Errors
    ///
    /// Will return `Err` if `name` is not a field of this collection or `value` fails validation
    pub fn add(&mut self, name: &str, value: &Param) -> Result<&mut Self, QueryError> {
        let field = self.collection.field(name)?;
        let params = self.encode(field, value, 1)?;
        self.merge(params);
        Ok(self)
    }

    #[must_use]
    pub fn collection(&self) -> &'r Collection {
        self.collection
    }

    #[must_use]
    pub fn params(&self) -> &ParamMap {
        &self.params
    }

    /// The accumulated parameters as a single request.
    #[must_use]
    pub fn finalize(&self) -> Vec<ParamMap> {
        vec![self.params.clone()]
    }

    pub(crate) fn encode(
        &self,
        field: &Field,
        value: &Param,
        metric_slot: usize,
    ) -> Result<ParamMap, QueryError> {
        let ctx = EncodeContext {
            players: self.players,
            metric_slot,
        };
        field.get_params(value, &ctx)
    }

    pub(crate) fn merge(&mut self, params: ParamMap) {
        self.params.extend(params);
    }

    pub(crate) fn set_raw(&mut self, key: &str, values: Vec<String>) {
        self.params.insert(key.to_string(), values);
    }
}

impl RequestPlanner for Query<'_> {
    fn url_path(&self) -> &str {
        &self.collection.slug
    }

    fn plan(&self) -> Result<RequestPlan, QueryError> {
        Ok(RequestPlan {
            requests: self.finalize(),
            ..RequestPlan::default()
        })
    }
}
